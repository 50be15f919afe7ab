//! Opening authenticated connections to a hub.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use homelink_domain::device::{Credentials, Device};

use crate::config::TelnetConfig;
use crate::error::{AuthError, TelnetError};

/// Byte ending both the login and the password prompt.
pub const PROMPT_DELIMITER: u8 = b':';

/// Line terminator on the wire.
pub const CRLF: &str = "\r\n";

/// Opens ready-to-use connections to one endpoint.
pub trait Connector: Send + Sync + 'static {
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect and complete any handshake.
    fn connect(&self) -> impl Future<Output = Result<Self::Conn, TelnetError>> + Send;
}

/// Plain TCP connector with the login/password handshake.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    credentials: Option<Credentials>,
    connect_timeout: Duration,
    auth_timeout: Duration,
}

impl TcpConnector {
    #[must_use]
    pub fn new(device: &Device, config: &TelnetConfig) -> Self {
        Self {
            address: device.address.clone(),
            credentials: device.credentials.clone(),
            connect_timeout: config.connect_timeout(),
            auth_timeout: config.auth_timeout(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    type Conn = TcpStream;

    async fn connect(&self) -> Result<TcpStream, TelnetError> {
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| TelnetError::ConnectTimeout(self.address.clone()))?
            .map_err(|source| TelnetError::Connect {
                address: self.address.clone(),
                source,
            })?;
        if let Some(credentials) = &self.credentials {
            authenticate(&mut stream, credentials, self.auth_timeout).await?;
        }
        tracing::debug!(address = %self.address, "connection opened");
        Ok(stream)
    }
}

/// Answer the login and password prompts.
///
/// Nothing after the password is read back; success is assumed unless the
/// connection fails.
///
/// # Errors
///
/// Returns [`AuthError`] when a prompt does not arrive in time, the
/// connection closes, or a write fails.
pub async fn authenticate<S>(
    stream: &mut S,
    credentials: &Credentials,
    wait: Duration,
) -> Result<(), AuthError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    read_until_prompt(stream, "login", wait).await?;
    write_line(stream, &credentials.login).await?;
    read_until_prompt(stream, "password", wait).await?;
    write_line(stream, &credentials.password).await?;
    Ok(())
}

async fn read_until_prompt<S>(
    stream: &mut S,
    prompt: &'static str,
    wait: Duration,
) -> Result<(), AuthError>
where
    S: AsyncRead + Unpin,
{
    let read = async {
        let mut byte = [0u8; 1];
        loop {
            if stream.read(&mut byte).await? == 0 {
                return Err(AuthError::Closed(prompt));
            }
            if byte[0] == PROMPT_DELIMITER {
                return Ok(());
            }
        }
    };
    timeout(wait, read)
        .await
        .map_err(|_| AuthError::Timeout(prompt))?
}

async fn write_line<S>(stream: &mut S, line: &str) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(CRLF.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;
    use homelink_domain::device::ConnectionSettings;

    fn credentials() -> Credentials {
        Credentials {
            login: "lutron".to_string(),
            password: "integration".to_string(),
        }
    }

    #[tokio::test]
    async fn should_answer_login_and_password_prompts() {
        let (mut client, server) = tokio::io::duplex(256);
        let bridge = tokio::spawn(async move {
            let mut server = BufReader::new(server);
            server.write_all(b"login: ").await.unwrap();
            let mut login = String::new();
            server.read_line(&mut login).await.unwrap();
            server.write_all(b"password: ").await.unwrap();
            let mut password = String::new();
            server.read_line(&mut password).await.unwrap();
            (login, password)
        });

        authenticate(&mut client, &credentials(), Duration::from_secs(1))
            .await
            .unwrap();

        let (login, password) = bridge.await.unwrap();
        assert_eq!(login, "lutron\r\n");
        assert_eq!(password, "integration\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_when_prompt_never_arrives() {
        let (mut client, _server) = tokio::io::duplex(256);

        let result = authenticate(&mut client, &credentials(), Duration::from_secs(5)).await;

        assert!(matches!(result, Err(AuthError::Timeout("login"))));
    }

    #[tokio::test]
    async fn should_fail_when_connection_closes_before_password_prompt() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"login: ").await.unwrap();
        drop(server);

        let result = authenticate(&mut client, &credentials(), Duration::from_secs(1)).await;

        assert!(matches!(
            result,
            Err(AuthError::Io(_) | AuthError::Closed("password"))
        ));
    }

    #[tokio::test]
    async fn should_connect_over_tcp_and_authenticate() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let bridge = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            socket.write_all(b"login: ").await.unwrap();
            let mut line = String::new();
            socket.read_line(&mut line).await.unwrap();
            socket.write_all(b"password: ").await.unwrap();
            socket.read_line(&mut line).await.unwrap();
            line
        });
        let device = Device::builder()
            .name("Smart Bridge")
            .address(address)
            .credentials("lutron", "integration")
            .connection(ConnectionSettings::default())
            .build()
            .unwrap();

        let connector = TcpConnector::new(&device, &TelnetConfig::default());
        connector.connect().await.unwrap();

        assert_eq!(bridge.await.unwrap(), "lutron\r\nintegration\r\n");
    }

    #[tokio::test]
    async fn should_report_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let device = Device::builder()
            .name("Gone")
            .address(address)
            .connection(ConnectionSettings::default())
            .build()
            .unwrap();

        let result = TcpConnector::new(&device, &TelnetConfig::default())
            .connect()
            .await;

        assert!(matches!(
            result,
            Err(TelnetError::Connect { .. } | TelnetError::ConnectTimeout(_))
        ));
    }
}
