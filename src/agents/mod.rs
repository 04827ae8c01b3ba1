mod panel;
pub mod roster;

pub use panel::OpinionPanel;
pub use roster::{AgentProfile, ESPECIALISTAS, SEQUENCIAIS};
