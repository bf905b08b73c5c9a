use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, trace};

use super::file::YamlConfigFile;
use super::schema::CONFIG_FILE_FIELD;
use super::settings::Settings;
use super::traits::ConfigFile;
use crate::error::Result;


/// An ordered set of mutually exclusive candidate files.
///
/// At most one candidate is ever read: the first one that exists as a regular
/// file. Sibling candidates after it (e.g. `app.yaml` next to `app.yml`) are
/// never opened, even if they exist too.
#[derive(Debug, Clone)]
pub struct MutexConfigGroup {
    paths: Vec<PathBuf>,
    record_provenance: bool,
}

impl MutexConfigGroup {
    /// A group that does not record which file supplied its values.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            record_provenance: false,
        }
    }

    /// Also write the winning file's path into the reserved `config_file` key.
    pub fn recording_provenance(mut self) -> Self {
        self.record_provenance = true;
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn records_provenance(&self) -> bool {
        self.record_provenance
    }

    /// The candidate that would be read right now, if any.
    pub fn winner(&self) -> Option<&Path> {
        self.paths
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.is_file())
    }

    /// Merge the winning file (if any) into `accumulator`, overwriting
    /// existing keys. Returns the path of the file that was read.
    ///
    /// Having no existing candidate is not an error. A winning file that
    /// fails to decode is.
    pub fn populate(&self, accumulator: &mut Settings) -> Result<Option<PathBuf>> {
        let Some(winner) = self.winner() else {
            trace!(candidates = self.paths.len(), "No candidate in group exists.");
            return Ok(None);
        };

        let file = YamlConfigFile::from_path(winner);
        let settings = file.to_settings()?;

        debug!(
            file = %winner.display(),
            keys = settings.len(),
            "Loaded configuration file."
        );

        accumulator.merge(settings);

        if self.record_provenance {
            accumulator.insert(
                CONFIG_FILE_FIELD,
                Value::String(winner.to_string_lossy().into_owned()),
            );
        }

        Ok(Some(winner.to_path_buf()))
    }
}
