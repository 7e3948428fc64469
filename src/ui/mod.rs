/// UI module exports

pub mod affordance;
pub mod components;
pub mod options;
