//! Port traits: the API this library offers (inbound) and the host
//! facilities it depends on (outbound).

pub mod inbound;
pub mod outbound;
