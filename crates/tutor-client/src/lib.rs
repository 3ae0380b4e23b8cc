//! Streaming consumer for the tutor chat relay.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutor_client::{ChatClient, ChatView, ClientConfig, StaticSession, ViewEvent};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tutor_client::ClientError> {
//! let client = ChatClient::new(ClientConfig::from_env())?;
//! let (view, mut events) = ChatView::new(
//!     Arc::new(client),
//!     Arc::new(StaticSession::signed_in("access-token")),
//! );
//! let render = tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         if let ViewEvent::Updated { content, .. } = event {
//!             println!("{content}");
//!         }
//!     }
//! });
//! view.send("帮我解释一下勾股定理").await;
//! drop(view);
//! render.await.ok();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod session;
pub mod stream;
pub mod view;

pub use client::{ChatClient, ChatTransport, ClientConfig};
pub use decoder::LineDecoder;
pub use error::{BoxError, ClientError};
pub use frame::StreamFrame;
pub use session::{SessionSource, StaticSession};
pub use stream::DeltaStream;
pub use view::{ChatView, DisplayMessage, SendOutcome, ViewEvent};
