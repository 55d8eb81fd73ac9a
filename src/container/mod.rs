use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier as reported by the container runtime.
///
/// Identifiers are unique among currently-running containers, but the runtime
/// may hand the same identifier to a later container; callers must not assume
/// uniqueness across a container's full lifetime.
///
/// # Examples
///
/// ```
/// # use quay_monitor::container::ContainerID;
/// let raw_id = "4f1b2c3d4e5f4f1b2c3d4e5f4f1b2c3d4e5f4f1b2c3d4e5f4f1b2c3d4e5f4f1b";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), raw_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or longer
    /// than [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first 12 characters, the short form runtimes print in
    /// their own tooling. Falls back to the full id for short identifiers.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ContainerID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Static metadata for a running container, captured at list time.
///
/// Everything here is baseline-free: it feeds the container-info event
/// directly and never participates in delta computation.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    id: ContainerID,
    names: Vec<String>,
    image: String,
    command: String,
    created: i64,
    state: String,
    labels: HashMap<String, String>,
}

impl ContainerInfo {
    pub fn new(
        id: ContainerID,
        names: Vec<String>,
        image: String,
        command: String,
        created: i64,
        state: String,
        labels: HashMap<String, String>,
    ) -> Self {
        Self {
            id,
            names,
            image,
            command,
            created,
            state,
            labels,
        }
    }

    pub fn id(&self) -> &ContainerID {
        &self.id
    }

    /// The container's primary name without the leading `/` the runtime
    /// prefixes to every name.
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .unwrap_or_else(|| self.id.short())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Creation time in UNIX epoch seconds.
    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}
