//! Live-sync pipeline for the agent pulse dashboard: fetch a full snapshot,
//! render it into sanitized fragments and write them into display regions.

pub mod fetch;
pub mod gesture;
pub mod markup;
pub mod model;
pub mod quick_filter;
pub mod refresh;
pub mod render;
pub mod timefmt;
pub mod view;

pub use fetch::{Fetcher, HttpFetcher};
pub use gesture::{GestureController, GestureEffect, GestureEvent, GestureState};
pub use markup::Markup;
pub use model::{MalformedField, Snapshot};
pub use quick_filter::QuickFilter;
pub use refresh::{
    refresh, Filter, OrderingPolicy, RefreshError, RefreshOutcome, RefreshTicket, RefreshTrigger,
    Session, REFRESH_INTERVAL,
};
pub use view::{region, RegionStore, Regions, ViewHandle};
