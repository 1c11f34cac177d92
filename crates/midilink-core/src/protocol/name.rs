//! Hierarchical request names and the MIDI-Link naming convention.
//!
//! # Why names? (for beginners)
//!
//! The substrate MIDI-Link runs on has no connections and no addresses in the
//! usual sense.  Every piece of data is fetched by *name*: a peer expresses a
//! request for `/topo-prefix/alice/midi-ndn/jam/12`, and whichever peer is
//! responsible for the `/topo-prefix/alice/...` prefix answers it.
//!
//! A name therefore has to encode everything the responder needs to know:
//!
//! ```text
//! /<root>/<peer>/<application>/<project>[/<device>]/<tag>
//!
//! /topo-prefix/bob/midi-ndn/jam/alice/heartbeat   alice probes bob
//! /topo-prefix/alice/midi-ndn/jam/12              bob pulls event batch #12
//! /topo-prefix/alice/midi-ndn/jam/shutdown        bob tells alice to stop
//! ```
//!
//! [`NameScheme`] builds and parses these names so that no other module has to
//! count path components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal tag for heartbeat probes and the handshake.
pub const HEARTBEAT_TAG: &str = "heartbeat";

/// Literal tag for explicit session teardown requests.
pub const SHUTDOWN_TAG: &str = "shutdown";

/// Errors produced while parsing names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The textual form did not start with `/`.
    #[error("name must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    /// Two consecutive separators produced an empty component.
    #[error("name contains an empty component: {0:?}")]
    EmptyComponent(String),

    /// The root, application or project component does not match ours.
    #[error("name {0} is outside this namespace")]
    ForeignNamespace(String),

    /// The name has the wrong number of components for the convention.
    #[error("name {name} has {len} components, expected 5 or 6")]
    WrongLength { name: String, len: usize },

    /// The trailing component is neither a literal tag nor a sequence number.
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),
}

// ── RemoteId ──────────────────────────────────────────────────────────────────

/// Identifier of a peer, as it appears in a name component.
///
/// This is the key of every per-remote table on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Tag ───────────────────────────────────────────────────────────────────────

/// The trailing component of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Handshake / liveness probe.
    Heartbeat,
    /// Explicit teardown.
    Shutdown,
    /// Sequence-numbered pull request.
    Seq(u64),
}

impl Tag {
    /// Parses a trailing component.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidTag`] when the component is neither a
    /// literal tag nor an unsigned decimal number.
    pub fn parse(component: &str) -> Result<Self, NameError> {
        match component {
            HEARTBEAT_TAG => Ok(Tag::Heartbeat),
            SHUTDOWN_TAG => Ok(Tag::Shutdown),
            other => other
                .parse::<u64>()
                .map(Tag::Seq)
                .map_err(|_| NameError::InvalidTag(other.to_string())),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Heartbeat => f.write_str(HEARTBEAT_TAG),
            Tag::Shutdown => f.write_str(SHUTDOWN_TAG),
            Tag::Seq(seq) => write!(f, "{seq}"),
        }
    }
}

// ── Name ──────────────────────────────────────────────────────────────────────

/// A hierarchical, `/`-separated name.
///
/// Serialises as its textual form so it can appear in TOML route tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// The empty (root) name, `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a name from individual components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a copy of this name with one more component.
    pub fn append(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Returns a copy of this name with a tag appended.
    pub fn append_tag(self, tag: Tag) -> Self {
        self.append(tag.to_string())
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The trailing component, if any.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Whether every component of `self` matches the start of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| NameError::MissingLeadingSlash(s.to_string()))?;
        if rest.is_empty() {
            return Ok(Name::root());
        }
        // A single trailing slash is tolerated ("/a/b/").
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let mut components = Vec::new();
        for part in rest.split('/') {
            if part.is_empty() {
                return Err(NameError::EmptyComponent(s.to_string()));
            }
            components.push(part.to_string());
        }
        Ok(Name { components })
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.to_string()
    }
}

// ── NameScheme ────────────────────────────────────────────────────────────────

/// A name decomposed according to the MIDI-Link convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// The peer that owns the prefix the name falls under.
    pub peer: RemoteId,
    /// The optional device component (present on heartbeat probes, where it
    /// identifies the probing sender).
    pub device: Option<RemoteId>,
    pub tag: Tag,
}

/// Builds and parses names for one `<root>/<application>/<project>` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameScheme {
    root: String,
    application: String,
    project: String,
}

impl NameScheme {
    pub fn new(
        root: impl Into<String>,
        application: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            application: application.into(),
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `/<root>/<peer>/<application>/<project>`: the prefix a peer registers
    /// and answers for.
    pub fn peer_prefix(&self, peer: &RemoteId) -> Name {
        Name::from_components([
            self.root.as_str(),
            peer.as_str(),
            self.application.as_str(),
            self.project.as_str(),
        ])
    }

    /// Heartbeat probe a sender expresses towards a receiver.
    pub fn heartbeat_name(&self, receiver: &RemoteId, sender: &RemoteId) -> Name {
        self.peer_prefix(receiver)
            .append(sender.as_str())
            .append_tag(Tag::Heartbeat)
    }

    /// Pull request a receiver expresses towards a sender.
    pub fn pull_name(&self, sender: &RemoteId, seq: u64) -> Name {
        self.peer_prefix(sender).append_tag(Tag::Seq(seq))
    }

    /// Teardown request a receiver expresses towards a sender.
    pub fn shutdown_name(&self, sender: &RemoteId) -> Name {
        self.peer_prefix(sender).append_tag(Tag::Shutdown)
    }

    /// Decomposes `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::WrongLength`] for names that are not 5 or 6
    /// components long, [`NameError::ForeignNamespace`] when the root,
    /// application or project differ from this scheme, and
    /// [`NameError::InvalidTag`] for an unparseable trailing component.
    pub fn parse(&self, name: &Name) -> Result<ParsedName, NameError> {
        let c = name.components();
        if c.len() != 5 && c.len() != 6 {
            return Err(NameError::WrongLength {
                name: name.to_string(),
                len: c.len(),
            });
        }
        if c[0] != self.root || c[2] != self.application || c[3] != self.project {
            return Err(NameError::ForeignNamespace(name.to_string()));
        }
        let device = (c.len() == 6).then(|| RemoteId::new(c[4].clone()));
        let tag = Tag::parse(&c[c.len() - 1])?;
        Ok(ParsedName {
            peer: RemoteId::new(c[1].clone()),
            device,
            tag,
        })
    }
}

impl Default for NameScheme {
    fn default() -> Self {
        Self::new("topo-prefix", "midi-ndn", "tmp-proj")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
