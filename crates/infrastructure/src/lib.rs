//! Horizon DNS infrastructure: the dispatch decision engine and the
//! collaborators it drives (cache, classifiers, transports, inbound handler).

pub mod dns;
