//! Model expansion configuration.

use crate::error::{FinmxError, Result};
use serde::{Deserialize, Serialize};

/// How symmetric models are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SymmetryBreaking {
    /// Enumerate every model.
    #[default]
    None,
    /// Detect interchangeable elements and add lex-leader constraints before solving.
    Static,
}

/// Options for one model expansion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Evaluate calculable definitions into the structure before grounding
    pub calculate_definitions: bool,
    /// Symmetry breaking mode
    pub symmetry_breaking: SymmetryBreaking,
    /// Maximum prefix length of each lex-leader constraint (0 = unbounded)
    pub symmetry_chain_length: usize,
    /// Number of models to return (0 = all)
    pub nb_models: usize,
    /// Verbosity passed to the solver
    pub verbosity: u32,
    /// Timeout in milliseconds for the whole expansion (0 = none)
    pub timeout_ms: u64,
    /// Maximum number of conflicts per solve (0 = unlimited)
    pub max_conflicts: u64,
    /// Base interval of the Luby restart sequence
    pub restart_base: u64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl ExpansionConfig {
    /// Plain search: no preprocessing, first model only.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            calculate_definitions: false,
            symmetry_breaking: SymmetryBreaking::None,
            symmetry_chain_length: 20,
            nb_models: 1,
            verbosity: 0,
            timeout_ms: 0,
            max_conflicts: 0,
            restart_base: 100,
        }
    }

    /// Default configuration: definitions are calculated, one model.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            calculate_definitions: true,
            ..Self::fast()
        }
    }

    /// Calculate definitions and break symmetries.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            calculate_definitions: true,
            symmetry_breaking: SymmetryBreaking::Static,
            ..Self::fast()
        }
    }

    /// Everything off; useful when debugging the encoding.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            symmetry_chain_length: 0,
            ..Self::fast()
        }
    }

    /// Set the number of requested models (0 = all)
    #[must_use]
    pub fn with_models(mut self, nb_models: usize) -> Self {
        self.nb_models = nb_models;
        self
    }

    /// Set the symmetry breaking mode
    #[must_use]
    pub fn with_symmetry_breaking(mut self, mode: SymmetryBreaking) -> Self {
        self.symmetry_breaking = mode;
        self
    }

    /// Enable or disable definition calculation
    #[must_use]
    pub fn with_calculate_definitions(mut self, enabled: bool) -> Self {
        self.calculate_definitions = enabled;
        self
    }

    /// Set the timeout of the whole expansion in milliseconds
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the conflict budget
    #[must_use]
    pub fn with_max_conflicts(mut self, max_conflicts: u64) -> Self {
        self.max_conflicts = max_conflicts;
        self
    }

    /// Set the solver verbosity
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the lex-leader prefix bound
    #[must_use]
    pub fn with_symmetry_chain_length(mut self, length: usize) -> Self {
        self.symmetry_chain_length = length;
        self
    }

    /// Check the configuration for values the pipeline cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.restart_base == 0 {
            return Err(FinmxError::InvalidConfig(
                "restart_base must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether all models were requested.
    #[must_use]
    pub fn wants_all_models(&self) -> bool {
        self.nb_models == 0
    }
}
