//! Network publisher: DNS, TCP, pinned TLS, then the row API.
//!
//! Each publish opens a fresh connection. The socket and TLS record
//! buffers are too large for a task stack, so the caller allocates one
//! [`NetBuffers`] statically and lends it to the publisher.

use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_time::{Duration, with_timeout};
use embedded_tls::{Aes128GcmSha256, TlsConfig, TlsConnection, TlsContext};
use hygro_core::config::ApiConfig;
use hygro_core::pipeline::Publisher;
use hygro_core::publish::{PublishError, RowApiClient};
use hygro_core::reading::Reading;

use crate::tls::{HalRng, PinnedCryptoProvider};

const TCP_BUFFER_SIZE: usize = 4096;
/// Maximum TLS record plus header, per RFC 8446.
const TLS_READ_BUFFER_SIZE: usize = 16_640;
const TLS_WRITE_BUFFER_SIZE: usize = 4096;
const HTTPS_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Socket and TLS record buffers, allocated once by the caller.
pub struct NetBuffers {
    tcp_rx: [u8; TCP_BUFFER_SIZE],
    tcp_tx: [u8; TCP_BUFFER_SIZE],
    tls_read: [u8; TLS_READ_BUFFER_SIZE],
    tls_write: [u8; TLS_WRITE_BUFFER_SIZE],
}

impl NetBuffers {
    pub const fn new() -> Self {
        Self {
            tcp_rx: [0; TCP_BUFFER_SIZE],
            tcp_tx: [0; TCP_BUFFER_SIZE],
            tls_read: [0; TLS_READ_BUFFER_SIZE],
            tls_write: [0; TLS_WRITE_BUFFER_SIZE],
        }
    }
}

pub struct NetworkPublisher<'a> {
    stack: Stack<'static>,
    config: &'a ApiConfig<'static>,
    client: RowApiClient<'a>,
    rng: HalRng,
    buffers: &'a mut NetBuffers,
}

impl<'a> NetworkPublisher<'a> {
    pub fn new(
        stack: Stack<'static>,
        config: &'a ApiConfig<'static>,
        rng: HalRng,
        buffers: &'a mut NetBuffers,
    ) -> Self {
        Self {
            stack,
            config,
            client: RowApiClient::new(config),
            rng,
            buffers,
        }
    }

    /// Ask the server to keep connections alive. Purely an efficiency
    /// knob; every call still opens its own session.
    pub fn enable_reuse(&mut self) {
        self.client.set_reuse(true);
    }

    /// Diagnostic read of the remote table's row count.
    pub async fn row_count(&mut self) -> Result<u32, PublishError> {
        let Self {
            stack,
            config,
            client,
            rng,
            buffers,
        } = self;

        let mut socket = TcpSocket::new(*stack, &mut buffers.tcp_rx, &mut buffers.tcp_tx);
        connect(*stack, config, &mut socket).await?;

        let mut tls = TlsConnection::<_, Aes128GcmSha256>::new(
            socket,
            &mut buffers.tls_read,
            &mut buffers.tls_write,
        );
        handshake(config, *rng, &mut tls).await?;

        let count = client.row_count(&mut tls).await;
        if let Err((_, err)) = tls.close().await {
            log::debug!("tls close failed: {err:?}");
        }
        count
    }
}

impl Publisher for NetworkPublisher<'_> {
    async fn publish(&mut self, reading: &Reading) -> Result<(), PublishError> {
        let Self {
            stack,
            config,
            client,
            rng,
            buffers,
        } = self;

        let mut socket = TcpSocket::new(*stack, &mut buffers.tcp_rx, &mut buffers.tcp_tx);
        connect(*stack, config, &mut socket).await?;

        let mut tls = TlsConnection::<_, Aes128GcmSha256>::new(
            socket,
            &mut buffers.tls_read,
            &mut buffers.tls_write,
        );
        handshake(config, *rng, &mut tls).await?;

        let result = client.append_row(&mut tls, reading).await;
        if let Err((_, err)) = tls.close().await {
            log::debug!("tls close failed: {err:?}");
        }
        result
    }
}

async fn connect(
    stack: Stack<'static>,
    config: &ApiConfig<'_>,
    socket: &mut TcpSocket<'_>,
) -> Result<(), PublishError> {
    let addresses = stack
        .dns_query(config.host, DnsQueryType::A)
        .await
        .map_err(|_| PublishError::Transport("dns query"))?;
    let address = *addresses
        .first()
        .ok_or(PublishError::Transport("dns query"))?;

    socket.set_timeout(Some(CONNECT_TIMEOUT));
    with_timeout(CONNECT_TIMEOUT, socket.connect((address, HTTPS_PORT)))
        .await
        .map_err(|_| PublishError::Transport("tcp connect"))?
        .map_err(|_| PublishError::Transport("tcp connect"))?;
    Ok(())
}

async fn handshake<'b, S>(
    config: &ApiConfig<'_>,
    rng: HalRng,
    tls: &mut TlsConnection<'b, S, Aes128GcmSha256>,
) -> Result<(), PublishError>
where
    S: embedded_io_async::Read + embedded_io_async::Write,
{
    let tls_config = TlsConfig::new().with_server_name(config.host);
    let provider = PinnedCryptoProvider::new(rng, config.certificate_sha256);
    tls.open(TlsContext::new(&tls_config, provider))
        .await
        .map_err(|err| {
            log::error!("tls handshake failed: {err:?}");
            PublishError::Transport("tls handshake")
        })
}
