mod blocklist_checker;
mod policy_engine;
mod upstream_exchanger;

pub use blocklist_checker::BlocklistChecker;
pub use policy_engine::PolicyEngine;
pub use upstream_exchanger::UpstreamExchanger;
