//! `BrokerAdapter` implementations (A2, §4.13): a scriptable in-memory mock used by
//! every unit/integration test and paper trading, plus a minimal HTTP-shaped stub
//! marking where a real broker client would plug in.

pub mod http_stub;
pub mod mock;
