//! Infrastructure layer: the dispatch queue and display-server transports.
//!
//! Everything here is replaceable from the application layer's point of
//! view: the display talks to the server through the [`session::DisplaySession`]
//! trait and delivers callbacks through a [`dispatch::TaskQueue`] handle it
//! does not own.

pub mod dispatch;
pub mod session;
