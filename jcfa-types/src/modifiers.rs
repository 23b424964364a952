use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    PackagePrivate,
    Private,
}

/// The modifier set carried by every declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_native: bool,
    pub is_synchronized: bool,
    pub is_strictfp: bool,
}

impl Modifiers {
    pub fn public() -> Self {
        Modifiers {
            visibility: Visibility::Public,
            ..Default::default()
        }
    }

    pub fn private() -> Self {
        Modifiers {
            visibility: Visibility::Private,
            ..Default::default()
        }
    }

    pub fn with_static(self) -> Self {
        Self {
            is_static: true,
            ..self
        }
    }

    pub fn with_final(self) -> Self {
        Self {
            is_final: true,
            ..self
        }
    }

    pub fn with_abstract(self) -> Self {
        Self {
            is_abstract: true,
            ..self
        }
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::new();
        match self.visibility {
            Visibility::Public => words.push("public"),
            Visibility::Protected => words.push("protected"),
            Visibility::Private => words.push("private"),
            Visibility::PackagePrivate => {}
        }
        for (set, word) in [
            (self.is_abstract, "abstract"),
            (self.is_static, "static"),
            (self.is_final, "final"),
            (self.is_native, "native"),
            (self.is_synchronized, "synchronized"),
            (self.is_strictfp, "strictfp"),
        ] {
            if set {
                words.push(word);
            }
        }
        write!(f, "{}", words.join(" "))
    }
}
