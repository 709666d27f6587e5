use serde::{Deserialize, Serialize};

/// Tagged variant over cognitive execution strategies, spec.md §3 "Strategy"
/// and Design Notes "Dynamic dispatch across strategies". Chosen once per
/// execution; Supervisor may spawn child strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Simple,
    Dag,
    React,
    Research,
    Debate,
    TreeOfThoughts,
    Reflection,
    Supervisor,
}

impl Strategy {
    pub const ALL: [Strategy; 8] = [
        Strategy::Simple,
        Strategy::Dag,
        Strategy::React,
        Strategy::Research,
        Strategy::Debate,
        Strategy::TreeOfThoughts,
        Strategy::Reflection,
        Strategy::Supervisor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Simple => "simple",
            Strategy::Dag => "dag",
            Strategy::React => "react",
            Strategy::Research => "research",
            Strategy::Debate => "debate",
            Strategy::TreeOfThoughts => "tree_of_thoughts",
            Strategy::Reflection => "reflection",
            Strategy::Supervisor => "supervisor",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
