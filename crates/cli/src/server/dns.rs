use hickory_server::ServerFuture;
use horizon_dns_infrastructure::dns::server::DnsServerHandler;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tracing::info;

const TCP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn serve(bind_address: &str, handler: DnsServerHandler) -> anyhow::Result<()> {
    let socket_addr = SocketAddr::from_str(bind_address)?;

    let udp_socket = UdpSocket::bind(socket_addr).await?;
    info!(protocol = "udp", address = %socket_addr, "DNS listener ready");

    let tcp_listener = TcpListener::bind(socket_addr).await?;
    info!(protocol = "tcp", address = %socket_addr, "DNS listener ready");

    let mut server = ServerFuture::new(handler);
    server.register_socket(udp_socket);
    server.register_listener(tcp_listener, TCP_REQUEST_TIMEOUT);

    server.block_until_done().await?;
    Ok(())
}
