use serde::{Deserialize, Serialize};
use strum::EnumString;

/// The order in which a compound assignment `lhs op= rhs` evaluates its operands.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString)]
pub enum EvaluationOrder {
    /// The side effects of `rhs` run before `lhs` is read, e.g. `x += ++x` adds the incremented
    /// `x` to itself. This is the historical behavior of the lowering.
    #[default]
    #[serde(rename = "legacy")]
    #[strum(serialize = "legacy")]
    Legacy,
    /// `lhs` is read into a temporary before the side effects of `rhs` run.
    #[serde(rename = "left-to-right")]
    #[strum(serialize = "left-to-right")]
    LeftToRight,
}

/// Configuration for lowering a program into control-flow automata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    // Qualified name of the entry function, e.g. `pkg.Main.main(java.lang.String[])`. The
    // parameter list may be left out if the name is unique without it.
    pub(crate) entry_function: String,
    pub(crate) compound_assignment_order: EvaluationOrder,
    pub(crate) lower_dynamic_dispatch: bool,
    pub(crate) only_reachable_functions: bool,
    pub(crate) verify_cfa: bool,
    pub(crate) lower_asserts: bool,
    pub(crate) print_cfa: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry_function: "Main.main".to_string(),
            compound_assignment_order: EvaluationOrder::default(),
            lower_dynamic_dispatch: true,
            only_reachable_functions: true,
            verify_cfa: true,
            lower_asserts: true,
            print_cfa: false,
        }
    }
}

impl BuildConfig {
    pub fn for_entry_function(entry_function: impl Into<String>) -> Self {
        Self {
            entry_function: entry_function.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from its TOML form. Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn entry_function(&self) -> &str {
        &self.entry_function
    }

    pub fn compound_assignment_order(self, a: EvaluationOrder) -> Self {
        Self {
            compound_assignment_order: a,
            ..self
        }
    }

    /// Whether virtual calls are expanded into branches over the known implementations.
    ///
    /// Default: `true`
    pub fn lower_dynamic_dispatch(self, a: bool) -> Self {
        Self {
            lower_dynamic_dispatch: a,
            ..self
        }
    }

    /// Whether the result only holds the functions reachable from the entry function and the
    /// class initializers.
    ///
    /// Default: `true`
    pub fn only_reachable_functions(self, a: bool) -> Self {
        Self {
            only_reachable_functions: a,
            ..self
        }
    }

    pub fn verify_cfa(self, a: bool) -> Self {
        Self {
            verify_cfa: a,
            ..self
        }
    }

    pub fn lower_asserts(self, a: bool) -> Self {
        Self {
            lower_asserts: a,
            ..self
        }
    }

    pub fn print_cfa(self, a: bool) -> Self {
        Self {
            print_cfa: a,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_toml_with_defaults() {
        let config = BuildConfig::from_toml_str(
            r#"
            entry-function = "pkg.App.run"
            compound-assignment-order = "left-to-right"
            lower-asserts = false
            "#,
        )
        .unwrap();
        assert_eq!(config.entry_function(), "pkg.App.run");
        assert_eq!(
            config.compound_assignment_order,
            EvaluationOrder::LeftToRight
        );
        assert!(!config.lower_asserts);
        assert!(config.lower_dynamic_dispatch);
        assert!(config.verify_cfa);
    }

    #[test]
    fn evaluation_order_from_str() {
        assert_eq!(
            EvaluationOrder::from_str("legacy").unwrap(),
            EvaluationOrder::Legacy
        );
        assert_eq!(
            EvaluationOrder::from_str("left-to-right").unwrap(),
            EvaluationOrder::LeftToRight
        );
        assert!(EvaluationOrder::from_str("right-to-left").is_err());
    }
}
