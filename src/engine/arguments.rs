use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mutable state shared between the caller and a training run.
///
/// `iteration` is the amount of completed training iterations, the run
/// resumes from it and keeps it up to date. Any other entry is carried
/// along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub iteration: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Arguments {
    /// Creates new `Arguments` resuming at `iteration`.
    pub fn starting_at(iteration: usize) -> Self {
        Self {
            iteration,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_iteration_defaults_to_zero() {
        let args: Arguments = serde_json::from_value(json!({})).unwrap();
        assert_eq!(args, Arguments::default());
    }

    #[test]
    fn extra_entries_survive_a_round_trip() {
        let value = json!({ "iteration": 40, "best_loss": 0.5, "tag": "warm" });

        let args: Arguments = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(args.iteration, 40);
        assert_eq!(args.extra.get("tag"), Some(&json!("warm")));

        assert_eq!(serde_json::to_value(&args).unwrap(), value);
    }
}
