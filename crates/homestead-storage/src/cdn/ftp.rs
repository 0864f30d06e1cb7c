use homestead_core::CdnConfig;
use std::io::Read;
use std::net::ToSocketAddrs;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use super::{CdnError, Connector, FtpTransport};

/// Production connector backed by `suppaftp`'s blocking client.
#[derive(Debug, Clone, Copy, Default)]
pub struct FtpConnector;

impl Connector for FtpConnector {
    fn connect(&self, config: &CdnConfig) -> Result<Box<dyn FtpTransport>, CdnError> {
        let host = config.host.clone().ok_or(CdnError::NotConfigured)?;
        let connect_err = |message: String| CdnError::Connect {
            host: host.clone(),
            message,
        };

        let addr = (host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("host did not resolve".to_string()))?;

        let mut stream =
            FtpStream::connect_timeout(addr, config.timeout).map_err(|e| connect_err(e.to_string()))?;

        // every later command, including QUIT on drop, is bounded by the same timeout
        let socket = stream.get_ref();
        socket
            .set_read_timeout(Some(config.timeout))
            .and_then(|_| socket.set_write_timeout(Some(config.timeout)))
            .map_err(|e| connect_err(e.to_string()))?;

        stream.set_mode(Mode::Passive);

        stream
            .login(
                config.username.as_deref().unwrap_or_default(),
                config.password.as_deref().unwrap_or_default(),
            )
            .map_err(|e| CdnError::Auth {
                host: host.clone(),
                message: e.to_string(),
            })?;

        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| CdnError::Command(format!("TYPE I: {}", e)))?;

        Ok(Box::new(SuppaTransport { stream }))
    }
}

struct SuppaTransport {
    stream: FtpStream,
}

impl FtpTransport for SuppaTransport {
    fn cwd(&mut self, path: &str) -> Result<(), CdnError> {
        self.stream
            .cwd(path)
            .map_err(|e| CdnError::Command(format!("CWD {}: {}", path, e)))
    }

    fn mkdir(&mut self, path: &str) -> Result<(), CdnError> {
        self.stream
            .mkdir(path)
            .map_err(|e| CdnError::Command(format!("MKD {}: {}", path, e)))
    }

    fn put(&mut self, name: &str, mut reader: &mut dyn Read) -> Result<u64, CdnError> {
        self.stream
            .put_file(name, &mut reader)
            .map_err(|e| CdnError::Transfer {
                path: name.to_string(),
                message: e.to_string(),
            })
    }

    fn size(&mut self, path: &str) -> Result<usize, CdnError> {
        self.stream
            .size(path)
            .map_err(|e| CdnError::Command(format!("SIZE {}: {}", path, e)))
    }

    fn remove(&mut self, path: &str) -> Result<(), CdnError> {
        self.stream
            .rm(path)
            .map_err(|e| CdnError::Command(format!("DELE {}: {}", path, e)))
    }

    fn quit(&mut self) -> Result<(), CdnError> {
        self.stream
            .quit()
            .map_err(|e| CdnError::Command(format!("QUIT: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::CdnClient;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Answers the login handshake, then never replies again.
    fn stalling_server() -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            let mut writer: TcpStream = socket.try_clone().unwrap();
            let mut reader = BufReader::new(socket);
            writer.write_all(b"220 ready\r\n").unwrap();
            for reply in ["331 password\r\n", "230 logged in\r\n", "200 binary\r\n"] {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                writer.write_all(reply.as_bytes()).unwrap();
            }
            thread::sleep(Duration::from_secs(5));
        });
        (port, handle)
    }

    fn config(port: u16) -> CdnConfig {
        CdnConfig {
            host: Some("127.0.0.1".to_string()),
            port,
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
            pull_zone: Some("cdn.example.test".to_string()),
            timeout: Duration::from_secs(1),
            ..CdnConfig::default()
        }
    }

    #[test]
    fn stalled_session_times_out() {
        let (port, server) = stalling_server();
        let mut transport = FtpConnector.connect(&config(port)).unwrap();

        let started = Instant::now();
        let result = transport.cwd("properties");

        assert!(matches!(result, Err(CdnError::Command(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
        drop(transport);
        server.join().unwrap();
    }

    #[test]
    fn stalled_server_fails_ensure_directory_within_timeout() {
        let (port, server) = stalling_server();
        let mut client = CdnClient::new(config(port), std::sync::Arc::new(FtpConnector));

        let started = Instant::now();
        let result = client.ensure_directory("properties/42");
        client.close();

        assert!(matches!(result, Err(CdnError::Directory { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
        server.join().unwrap();
    }
}
