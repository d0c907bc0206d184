//! Accessor paths into schema and configuration trees.
//!
//! A [`FieldPath`] addresses a single node, for example `spec.driver.cores`,
//! `spec.volumes[1].name` or `metadata.labels["app"]`. Schema-level paths use the
//! `[]` segment to step into the element descriptor of a list, e.g. `spec.volumes[].name`.
use std::fmt::{Display, Write};

/// A single step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// A named field of an object, using its surface name.
    Field(String),

    /// A concrete position in a list.
    Index(usize),

    /// A key of a map.
    Key(String),

    /// The element descriptor of a list, independent of any concrete position.
    Element,
}

/// A dotted/indexed accessor into a tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The path of the tree root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a schema path written as dotted surface names, where a trailing `[]` on a
    /// segment steps into a list element, e.g. `spec.volumes[].name`.
    ///
    /// Empty input yields the root path.
    pub fn from_dotted(dotted: &str) -> Self {
        let mut segments = Vec::new();

        for part in dotted.split('.').filter(|part| !part.is_empty()) {
            let mut name = part;
            let mut elements = 0;
            while let Some(stripped) = name.strip_suffix("[]") {
                name = stripped;
                elements += 1;
            }

            if !name.is_empty() {
                segments.push(Segment::Field(name.to_owned()));
            }
            segments.extend(std::iter::repeat_n(Segment::Element, elements));
        }

        Self { segments }
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::from_dotted(value)
    }
}

impl FromIterator<Segment> for FieldPath {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key:?}]")?,
                Segment::Element => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

/// Tracks the position inside a tree while it is being walked.
///
/// Contexts form a chain of borrowed parents, so descending into a child is free and the
/// full [`FieldPath`] is only assembled when an error actually needs to be reported.
pub struct PathContext<'a> {
    segment: Option<Segment>,
    parent: Option<&'a PathContext<'a>>,
}

impl<'a> PathContext<'a> {
    /// Creates the context of the tree root.
    pub fn root() -> PathContext<'static> {
        PathContext {
            segment: None,
            parent: None,
        }
    }

    /// Creates a context for the object field `name` below the current one.
    pub fn field<'b>(&'b self, name: &str) -> PathContext<'b> {
        self.child(Segment::Field(name.to_owned()))
    }

    /// Creates a context for the list position `index` below the current one.
    pub fn index<'b>(&'b self, index: usize) -> PathContext<'b> {
        self.child(Segment::Index(index))
    }

    /// Creates a context for the map key `key` below the current one.
    pub fn key<'b>(&'b self, key: &str) -> PathContext<'b> {
        self.child(Segment::Key(key.to_owned()))
    }

    /// Creates a context for the element descriptor of a list below the current one.
    pub fn element<'b>(&'b self) -> PathContext<'b> {
        self.child(Segment::Element)
    }

    fn child<'b>(&'b self, segment: Segment) -> PathContext<'b> {
        PathContext {
            segment: Some(segment),
            parent: Some(self),
        }
    }

    /// Assembles the full path from the root to this context.
    pub fn path(&self) -> FieldPath {
        let mut segments = Vec::new();
        let mut curr = Some(self);
        while let Some(curr_some) = curr {
            if let Some(segment) = &curr_some.segment {
                segments.push(segment.clone());
            }
            curr = curr_some.parent;
        }
        segments.reverse();
        FieldPath { segments }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "<root>")]
    #[case("name", "name")]
    #[case("spec.template.driver.cores", "spec.template.driver.cores")]
    #[case("spec.volumes[].name", "spec.volumes[].name")]
    #[case("matrix[][]", "matrix[][]")]
    fn dotted_paths_display_unchanged(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(FieldPath::from_dotted(input).to_string(), expected);
    }

    #[test]
    fn context_assembles_indexed_path() {
        let root = PathContext::root();
        let spec = root.field("spec");
        let volumes = spec.field("volumes");
        let second = volumes.index(1);
        let name = second.field("name");

        assert_eq!(name.path().to_string(), "spec.volumes[1].name");
    }

    #[test]
    fn context_quotes_map_keys() {
        let root = PathContext::root();
        let metadata = root.field("metadata");
        let labels = metadata.field("labels");
        let app = labels.key("app.kubernetes.io/name");

        assert_eq!(
            app.path().to_string(),
            r#"metadata.labels["app.kubernetes.io/name"]"#
        );
    }

    #[test]
    fn element_context_matches_dotted_schema_path() {
        let root = PathContext::root();
        let hosts = root.field("hosts");
        let element = hosts.element();
        let ip = element.field("ip");

        assert_eq!(ip.path(), FieldPath::from_dotted("hosts[].ip"));
    }
}
