//! Internal IMAP session management.
//!
//! This module wraps async-imap operations with proper error handling. The
//! mailbox is always opened with EXAMINE (read-only) and messages are fetched
//! with `BODY.PEEK[]`, so polling never alters mailbox state or marks
//! messages as seen.

use crate::connection::TlsStream;
use crate::error::{Error, Result};
use async_imap::Session;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Authenticates to IMAP server and returns a session.
#[instrument(
    name = "session::authenticate",
    skip_all,
    fields(address = %address)
)]
pub(crate) async fn authenticate(
    tls_stream: TlsStream,
    address: &str,
    secret: &str,
) -> Result<ImapSession> {
    let client = async_imap::Client::new(tls_stream);

    debug!("Authenticating to IMAP server");

    client
        .login(address, secret)
        .await
        .map_err(|e| Error::ImapLogin {
            address: address.to_string(),
            source: e.0,
        })
}

/// Opens a mailbox read-only (EXAMINE) and returns its message count.
#[instrument(name = "session::examine", skip(session), fields(mailbox = %mailbox))]
pub(crate) async fn examine_mailbox(session: &mut ImapSession, mailbox: &str) -> Result<u32> {
    debug!("Opening mailbox read-only");

    let meta = session
        .examine(mailbox)
        .await
        .map_err(|source| Error::OpenMailbox {
            mailbox: mailbox.to_string(),
            source,
        })?;

    debug!(exists = meta.exists, "Mailbox opened");

    Ok(meta.exists)
}

/// Fetches full messages by sequence-number range, without touching flags.
///
/// Returns a boxed stream of fetch results.
pub(crate) async fn fetch_window<'a>(
    session: &'a mut ImapSession,
    range: &str,
) -> Result<BoxStream<'a, std::result::Result<async_imap::types::Fetch, async_imap::error::Error>>>
{
    debug!(range = %range, "Fetching message window");

    let stream = session
        .fetch(range, "BODY.PEEK[]")
        .await
        .map_err(|source| Error::ImapFetch {
            range: range.to_string(),
            source,
        })?;

    Ok(stream.boxed())
}

/// Logs out from IMAP session.
#[instrument(name = "session::logout", skip(session))]
pub(crate) async fn logout(session: &mut ImapSession) -> Result<()> {
    debug!("Logging out");

    session
        .logout()
        .await
        .map_err(|source| Error::ImapLogout { source })?;

    Ok(())
}
