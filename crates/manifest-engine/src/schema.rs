//! Declarative descriptions of resource attribute trees.
//!
//! A [`Schema`] is built once, usually by a function per resource type, and is never mutated
//! afterwards. Every [`Node`] carries its surface name (the name users write in their
//! configuration), the key it is emitted under in the document, its [`Kind`] and its
//! [`Requirement`].
//!
//! ```
//! use manifest_engine::schema::{Kind, Node, ScalarKind, Schema};
//!
//! let schema = Schema::new([
//!     Node::required("name", Kind::String),
//!     Node::optional("replicas", Kind::Int),
//!     Node::optional("pod_labels", Kind::map_of(ScalarKind::String)),
//! ]);
//!
//! assert_eq!(schema.child("pod_labels").unwrap().document_key(), "podLabels");
//! ```
use std::fmt::{Display, Write};

use convert_case::{Case, Casing};
use indexmap::IndexMap;

use crate::{
    path::{FieldPath, PathContext, Segment},
    predicate::Predicate,
};

/// The type of a leaf value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarKind {
    String,
    Int,
    Bool,
}

/// Whether a node has to, may, or must not be supplied by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum Requirement {
    /// Present in every valid configuration.
    Required,

    /// May be left out, in which case nothing is emitted for it.
    Optional,

    /// Derived by the engine. Never user-supplied, always emitted.
    Computed,
}

/// The shape of a node.
#[derive(Clone, Debug)]
pub enum Kind {
    Scalar(ScalarKind),

    /// An ordered sequence, every element is described by the boxed kind.
    List(Box<Kind>),

    /// String keys to scalar values. Emitted with keys in lexicographic order.
    Map(ScalarKind),

    /// A nested set of named child nodes.
    Object(Fields),
}

#[allow(non_upper_case_globals)]
impl Kind {
    pub const Bool: Self = Self::Scalar(ScalarKind::Bool);
    pub const Int: Self = Self::Scalar(ScalarKind::Int);
    pub const String: Self = Self::Scalar(ScalarKind::String);

    /// A list whose elements have the given kind.
    pub fn list_of(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    /// A map from string keys to values of the given scalar kind.
    pub fn map_of(value: ScalarKind) -> Self {
        Self::Map(value)
    }

    /// An object with the given child nodes, in declaration order.
    pub fn object(children: impl IntoIterator<Item = Node>) -> Self {
        Self::Object(Fields::new(children))
    }

    /// The child nodes of an object kind, looking through any number of list layers.
    pub fn fields(&self) -> Option<&Fields> {
        match self {
            Self::Object(fields) => Some(fields),
            Self::List(element) => element.fields(),
            Self::Scalar(_) | Self::Map(_) => None,
        }
    }

    /// A short, user facing name of this kind, as used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(scalar) => (*scalar).into(),
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Map(value) => write!(f, "map<string, {value}>"),
            Self::Object(_) => f.write_str("object"),
        }
    }
}

/// A single attribute of a schema.
#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    document_key: String,
    kind: Kind,
    requirement: Requirement,
    predicates: Vec<Predicate>,
}

impl Node {
    /// Creates a node. The document key is derived from `name` by converting it to
    /// lowerCamelCase, use [`Node::with_document_key`] to override it.
    pub fn new(name: impl Into<String>, kind: Kind, requirement: Requirement) -> Self {
        let name = name.into();
        let document_key = name.from_case(Case::Snake).to_case(Case::Camel);

        Self {
            name,
            document_key,
            kind,
            requirement,
            predicates: Vec::new(),
        }
    }

    pub fn required(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, kind, Requirement::Required)
    }

    pub fn optional(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, kind, Requirement::Optional)
    }

    pub fn computed(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, kind, Requirement::Computed)
    }

    /// Overrides the key this node is emitted under.
    pub fn with_document_key(mut self, document_key: impl Into<String>) -> Self {
        self.document_key = document_key.into();
        self
    }

    /// Adds a predicate that every string value of this node has to satisfy.
    ///
    /// Predicates of list nodes apply to each string element, predicates of map nodes to each
    /// string value. Predicates of computed nodes are ignored, computed values are never
    /// user input.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document_key(&self) -> &str {
        &self.document_key
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub fn predicates(&self) -> &[Predicate] {
        match self.requirement {
            Requirement::Computed => &[],
            Requirement::Required | Requirement::Optional => &self.predicates,
        }
    }

    /// Looks up a direct child of an object node.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.fields().and_then(|fields| fields.child(name))
    }

    /// The child nodes of this node if it is an object, or a list of objects.
    pub fn fields(&self) -> Option<&Fields> {
        self.kind.fields()
    }
}

/// An ordered set of sibling nodes, unique by name.
#[derive(Clone, Debug, Default)]
pub struct Fields(IndexMap<String, Node>);

impl Fields {
    /// Collects the nodes in the given order. A later node with an already used name replaces
    /// the earlier one but keeps its position.
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self(
            nodes
                .into_iter()
                .map(|node| (node.name.clone(), node))
                .collect(),
        )
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.0.get(name)
    }

    /// Looks up a node by the key it is emitted under.
    pub fn by_document_key(&self, document_key: &str) -> Option<&Node> {
        self.0
            .values()
            .find(|node| node.document_key == document_key)
    }

    /// Iterates the nodes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type IntoIter = indexmap::map::Values<'a, String, Node>;
    type Item = &'a Node;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}

/// The root of a resource's attribute tree.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: Fields,
}

impl Schema {
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            fields: Fields::new(nodes),
        }
    }

    /// The top-level nodes in declaration order.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Looks up a top-level node.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.fields.child(name)
    }

    /// Looks up a node by its schema path, e.g. `spec.volumes[].name`.
    pub fn node(&self, path: &FieldPath) -> Option<&Node> {
        let mut fields = Some(&self.fields);
        let mut found = None;

        for segment in path.segments() {
            match segment {
                Segment::Field(name) => {
                    let node = fields?.child(name)?;
                    found = Some(node);
                    fields = node.fields();
                }
                // Element children are reachable through `Node::fields` already
                Segment::Element => {}
                Segment::Index(_) | Segment::Key(_) => return None,
            }
        }

        found
    }

    /// Walks every node depth-first in declaration order.
    ///
    /// The visitor receives each node together with its schema path. Children of lists of
    /// objects are visited below an element segment, e.g. `spec.volumes[].name`.
    pub fn for_each_node<F>(&self, mut visitor: F)
    where
        F: FnMut(&FieldPath, &Node),
    {
        walk_fields(&self.fields, &PathContext::root(), &mut visitor);
    }

    /// The schema paths of all computed nodes, in walk order.
    pub fn computed_paths(&self) -> Vec<FieldPath> {
        let mut paths = Vec::new();
        self.for_each_node(|path, node| {
            if node.requirement() == Requirement::Computed {
                paths.push(path.clone());
            }
        });
        paths
    }
}

fn walk_fields<F>(fields: &Fields, ctx: &PathContext, visitor: &mut F)
where
    F: FnMut(&FieldPath, &Node),
{
    for node in fields {
        let ctx = ctx.field(node.name());
        visitor(&ctx.path(), node);
        walk_kind(node.kind(), &ctx, visitor);
    }
}

fn walk_kind<F>(kind: &Kind, ctx: &PathContext, visitor: &mut F)
where
    F: FnMut(&FieldPath, &Node),
{
    match kind {
        Kind::Object(children) => walk_fields(children, ctx, visitor),
        Kind::List(element) => walk_kind(element, &ctx.element(), visitor),
        Kind::Scalar(_) | Kind::Map(_) => {}
    }
}

/// Renders the schema as an indented tree, one node per line.
impl Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_fields(
            f: &mut std::fmt::Formatter<'_>,
            fields: &Fields,
            depth: usize,
        ) -> std::fmt::Result {
            for node in fields {
                for _ in 0..depth {
                    f.write_str("  ")?;
                }
                write!(
                    f,
                    "{name} ({key}): {kind} [{requirement}]",
                    name = node.name(),
                    key = node.document_key(),
                    kind = node.kind(),
                    requirement = node.requirement(),
                )?;
                f.write_char('\n')?;

                if let Some(children) = node.fields() {
                    write_fields(f, children, depth + 1)?;
                }
            }
            Ok(())
        }

        write_fields(f, &self.fields, 0)
    }
}
