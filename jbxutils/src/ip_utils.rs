use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Devine l'adresse IP locale de la machine.
///
/// Un socket UDP est "connecté" vers un résolveur public : aucun paquet n'est
/// émis, mais le système choisit l'interface de sortie et on lit son adresse.
/// Retourne `127.0.0.1` si la détection échoue.
pub fn guess_local_ip() -> String {
    probe_outbound_ip()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .to_string()
}

fn probe_outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("1.1.1.1:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
