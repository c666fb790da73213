//! Access planning. Only index-intersection enumeration lives here; cost
//! ranking of the produced alternatives belongs to the caller.

pub mod multi_index;
