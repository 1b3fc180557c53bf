use std::collections::BTreeSet;

/// A named, independently selectable unit of setup work.
///
/// Components are static data: the catalog is defined once in [`CATALOG`] and
/// never mutated at runtime. Ids are unique within a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Short unique identifier (e.g. "python", "rust")
    pub id: &'static str,

    /// Menu label
    pub label: &'static str,

    /// One-line description shown next to the label
    pub description: &'static str,

    /// Pre-checked state in the selection menu and the non-interactive default
    pub default_selected: bool,

    /// Lower ranks install earlier; `None` installs last, in catalog order
    pub precedence_rank: Option<u32>,
}

impl Component {
    /// Sort key used by the sequencer: ranked components first, by rank.
    pub fn order_key(&self) -> (bool, u32) {
        match self.precedence_rank {
            Some(rank) => (false, rank),
            None => (true, 0),
        }
    }
}

/// The built-in component catalog, in discovery order.
pub const CATALOG: &[Component] = &[
    Component {
        id: "homebrew",
        label: "Homebrew",
        description: "Homebrew package manager (macOS only)",
        default_selected: true,
        precedence_rank: Some(0),
    },
    Component {
        id: "essentials",
        label: "Build essentials",
        description: "Compiler toolchain, git, curl and unzip from the system package manager",
        default_selected: true,
        precedence_rank: Some(1),
    },
    Component {
        id: "mise",
        label: "mise",
        description: "Polyglot runtime version manager",
        default_selected: true,
        precedence_rank: Some(2),
    },
    Component {
        id: "python",
        label: "Python",
        description: "Latest CPython through mise",
        default_selected: true,
        precedence_rank: Some(3),
    },
    Component {
        id: "node",
        label: "Node.js",
        description: "Node.js LTS through mise",
        default_selected: true,
        precedence_rank: Some(3),
    },
    Component {
        id: "rust",
        label: "Rust",
        description: "Stable Rust toolchain through rustup",
        default_selected: true,
        precedence_rank: Some(3),
    },
    Component {
        id: "go",
        label: "Go",
        description: "Latest Go through mise",
        default_selected: false,
        precedence_rank: Some(3),
    },
    Component {
        id: "zsh",
        label: "Zsh + Oh My Zsh",
        description: "Z shell with the Oh My Zsh framework",
        default_selected: true,
        precedence_rank: Some(4),
    },
    Component {
        id: "cli-tools",
        label: "CLI tools",
        description: "ripgrep, fd and bat built with cargo",
        default_selected: false,
        precedence_rank: Some(5),
    },
    Component {
        id: "fonts",
        label: "Nerd Fonts",
        description: "JetBrainsMono Nerd Font for terminal glyphs",
        default_selected: false,
        precedence_rank: None,
    },
];

/// The built-in catalog.
pub fn catalog() -> &'static [Component] {
    CATALOG
}

/// Look up a component by id.
pub fn find<'a>(catalog: &'a [Component], id: &str) -> Option<&'a Component> {
    catalog.iter().find(|c| c.id == id)
}

/// The user's chosen subset of component ids.
///
/// Order carries no meaning here; the sequencer imposes order through
/// [`Component::precedence_rank`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every component marked `default_selected` in the catalog
    pub fn defaults(catalog: &[Component]) -> Self {
        catalog
            .iter()
            .filter(|c| c.default_selected)
            .map(|c| c.id)
            .collect()
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
