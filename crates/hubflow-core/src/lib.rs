//! # hubflow-core: District Energy Network Model
//!
//! Typed building blocks shared by every hubflow crate: the fixed
//! multi-carrier topology, the time-series input contract, heat pump and
//! conversion coefficients, run configuration, and the unified error type.
//!
//! ## Design Philosophy
//!
//! The district is a **directed graph** with a closed set of nodes and links:
//! - **Hubs**: low-voltage grid, gas network, high- and low-temperature networks
//! - **Technologies**: heat pumps, CHP, gas boiler, power-to-gas
//! - **Boundaries**: external supplies, demands, PV, the lake and gas storage
//!
//! Nothing here depends on an LP solver. Model construction and the
//! lexicographic solve live in `hubflow-algo`.
//!
//! ## Quick Start
//!
//! ```rust
//! use hubflow_core::*;
//!
//! let topology = Topology::district();
//! assert_eq!(topology.inflows(Node::LowVoltage).len(), 3);
//!
//! let conversion = ConversionModel::default();
//! assert!(conversion.cop(HeatPump::HeatingHt) > 1.0);
//!
//! let inputs = TimeSeriesInputs::constant(4, 1000.0);
//! let window = inputs.window(4).unwrap();
//! assert_eq!(window.horizon(), 4);
//! ```

pub mod config;
pub mod conversion;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod inputs;
pub mod topology;
pub mod units;

pub use config::{
    DispatchConfig, DispatchParams, ImportPrices, InputsConfig, SecondaryObjective, SeriesFiles,
    SolverConfig,
};
pub use conversion::{
    cop_cool, cop_heat, ConversionModel, ConversionRatios, ConversionRule, DesignTemperatures,
    EmissionFactors, HeatPump,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{DispatchError, HubflowResult};
pub use graph_utils::{export_graph, topology_stats, TopologyStats};
pub use inputs::{HorizonInputs, InputSeries, SeriesKind, TimeSeriesInputs};
pub use topology::{FlowBound, Link, LinkSpec, Node, Topology, LINK_TABLE};
pub use units::{Celsius, Kelvin};
