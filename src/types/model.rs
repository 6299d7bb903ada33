use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A model identifier the chat front-end may select.
///
/// The set is closed: the selector only offers these names, and parsing any
/// other string is a validation error.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Mistral 7B.
    #[default]
    Mistral,

    /// Llama 2.
    Llama2,

    /// Code Llama.
    Codellama,
}

impl Model {
    /// Every selectable model, in selector order.
    pub const ALL: [Model; 3] = [Model::Mistral, Model::Llama2, Model::Codellama];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Mistral => "mistral",
            Model::Llama2 => "llama2",
            Model::Codellama => "codellama",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Model::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let choices = Model::ALL
                    .iter()
                    .map(Model::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                Error::validation(
                    format!("unknown model '{wanted}' (choose one of: {choices})"),
                    Some("model".to_string()),
                )
            })
    }
}
