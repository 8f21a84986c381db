//! Logs endpoint registration transitions.

use meter_connector::ConnectionStatus;
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct LoggingConnectionHandler;

impl ConnectionStatus for LoggingConnectionHandler {
    fn registered(&self, node_name: &str) {
        info!("ConnectionHandler: endpoint {} registered", node_name);
    }

    fn re_registered(&self, node_name: &str) {
        info!("ConnectionHandler: endpoint {} re-registered", node_name);
    }

    fn deregistered(&self, node_name: &str) {
        info!("ConnectionHandler: endpoint {} de-registered", node_name);
    }

    fn registration_failed(&self, node_name: &str, reason: &str) {
        error!("ConnectionHandler: endpoint {} registration failed: {}", node_name, reason);
    }
}
