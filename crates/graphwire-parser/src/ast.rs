//! The GraphQL document AST.
//!
//! Nodes are plain sum types discriminated by [`NodeKind`]; each node carries
//! only the fields relevant to its kind, a source [`Location`], and the
//! comment attached to it (if one immediately preceded it in source).

/// Discriminator over every AST node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// A query/mutation/subscription definition.
    OperationDefinition,
    /// A `fragment X on T { ... }` definition.
    FragmentDefinition,
    /// A `{ ... }` selection block.
    SelectionSet,
    /// A field selection, possibly aliased.
    Field,
    /// A `...Name` fragment spread.
    FragmentSpread,
    /// A `... on T { ... }` inline fragment.
    InlineFragment,
}

/// Where a node sits in the source text.
///
/// `line`/`column` are the 1-based position of the node's first token;
/// `start`/`end` are the byte span covering the whole node, usable to slice
/// the node's raw text back out of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Starting line (1-indexed).
    pub line: u32,
    /// Starting column (1-indexed).
    pub column: u32,
    /// Byte offset of the node's first byte.
    pub start: usize,
    /// Byte offset one past the node's last byte.
    pub end: usize,
}

/// The operation keyword of an operation definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationKind {
    /// A read-only operation; also the default when no keyword is given.
    #[default]
    Query,
    /// A write operation.
    Mutation,
    /// A long-lived event-stream operation.
    Subscription,
}

impl OperationKind {
    /// The source keyword for this operation kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

/// A parsed document: zero or more definitions in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The definitions in source order.
    pub definitions: Vec<Definition>,
    /// Span of the whole document.
    pub loc: Location,
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// An operation definition.
    Operation(OperationDefinition),
    /// A fragment definition.
    Fragment(FragmentDefinition),
}

impl Definition {
    /// The kind tag of this definition's node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Operation(_) => NodeKind::OperationDefinition,
            Self::Fragment(_) => NodeKind::FragmentDefinition,
        }
    }

    /// The definition's source location.
    pub fn loc(&self) -> Location {
        match self {
            Self::Operation(op) => op.loc,
            Self::Fragment(frag) => frag.loc,
        }
    }
}

/// A query/mutation/subscription definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDefinition {
    /// The operation keyword (defaults to `query` when omitted in source).
    pub operation: OperationKind,
    /// The operation name, if any.
    pub name: Option<String>,
    /// The top-level selection set.
    pub selection_set: SelectionSet,
    /// Source location.
    pub loc: Location,
    /// Comment attached to this definition.
    pub comment: Option<String>,
}

/// A named fragment definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDefinition {
    /// The fragment's name.
    pub name: String,
    /// The type the fragment selects against.
    pub type_condition: String,
    /// The fragment's selection set.
    pub selection_set: SelectionSet,
    /// Source location.
    pub loc: Location,
    /// Comment attached to this definition.
    pub comment: Option<String>,
}

/// A `{ ... }` block of selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    /// The selections, in source order.
    pub selections: Vec<Selection>,
    /// Source location.
    pub loc: Location,
}

/// One entry in a selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A field selection.
    Field(Field),
    /// A fragment spread.
    FragmentSpread(FragmentSpread),
    /// An inline fragment.
    InlineFragment(InlineFragment),
}

/// A field selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The alias, when written as `alias: name`.
    pub alias: Option<String>,
    /// The field name.
    pub name: String,
    /// The nested selection set, if any.
    pub selection_set: Option<SelectionSet>,
    /// Source location.
    pub loc: Location,
    /// Comment attached to this field.
    pub comment: Option<String>,
}

/// A `...Name` fragment spread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSpread {
    /// The referenced fragment's name.
    pub name: String,
    /// Source location.
    pub loc: Location,
    /// Comment attached to this spread.
    pub comment: Option<String>,
}

/// A `... on T { ... }` inline fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineFragment {
    /// The type condition, if one was written.
    pub type_condition: Option<String>,
    /// The inline selection set.
    pub selection_set: SelectionSet,
    /// Source location.
    pub loc: Location,
    /// Comment attached to this fragment.
    pub comment: Option<String>,
}

/// A borrowed view of any traversable AST node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// An operation definition.
    Operation(&'a OperationDefinition),
    /// A fragment definition.
    Fragment(&'a FragmentDefinition),
    /// A field selection.
    Field(&'a Field),
    /// A fragment spread.
    FragmentSpread(&'a FragmentSpread),
    /// An inline fragment.
    InlineFragment(&'a InlineFragment),
}

impl NodeRef<'_> {
    /// The kind tag of the viewed node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Operation(_) => NodeKind::OperationDefinition,
            Self::Fragment(_) => NodeKind::FragmentDefinition,
            Self::Field(_) => NodeKind::Field,
            Self::FragmentSpread(_) => NodeKind::FragmentSpread,
            Self::InlineFragment(_) => NodeKind::InlineFragment,
        }
    }
}

impl Document {
    /// Walk every definition and its descendants, pre-order depth-first.
    ///
    /// The walk descends into a node's selection set only for
    /// [`Field`] and [`OperationDefinition`] nodes; fragment definitions,
    /// fragment spreads, and inline fragments are leaves for traversal
    /// purposes even when they nest further. The walk uses an explicit
    /// stack: selection nesting depth is author-controlled input and must
    /// not be able to exhaust call depth.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<NodeRef<'_>> = Vec::with_capacity(self.definitions.len());
        for def in self.definitions.iter().rev() {
            stack.push(match def {
                Definition::Operation(op) => NodeRef::Operation(op),
                Definition::Fragment(frag) => NodeRef::Fragment(frag),
            });
        }
        Descendants { stack }
    }
}

impl OperationDefinition {
    /// Walk this definition and its descendants (see [`Document::descendants`]).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![NodeRef::Operation(self)],
        }
    }
}

impl FragmentDefinition {
    /// Walk this definition and its descendants.
    ///
    /// A fragment definition is itself a traversal leaf, so the walk also
    /// visits the selections directly under it (otherwise the iterator
    /// would yield only the definition node).
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack = Vec::with_capacity(self.selection_set.selections.len() + 1);
        for sel in self.selection_set.selections.iter().rev() {
            stack.push(selection_ref(sel));
        }
        stack.push(NodeRef::Fragment(self));
        Descendants { stack }
    }
}

fn selection_ref(sel: &Selection) -> NodeRef<'_> {
    match sel {
        Selection::Field(f) => NodeRef::Field(f),
        Selection::FragmentSpread(s) => NodeRef::FragmentSpread(s),
        Selection::InlineFragment(i) => NodeRef::InlineFragment(i),
    }
}

/// Iterator over AST nodes, pre-order depth-first with an explicit stack.
pub struct Descendants<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        let selection_set = match node {
            NodeRef::Operation(op) => Some(&op.selection_set),
            NodeRef::Field(field) => field.selection_set.as_ref(),
            _ => None,
        };
        if let Some(set) = selection_set {
            // Reverse so siblings pop in source order.
            for sel in set.selections.iter().rev() {
                self.stack.push(selection_ref(sel));
            }
        }

        Some(node)
    }
}
