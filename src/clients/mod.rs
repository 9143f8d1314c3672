pub mod master_client;
pub mod service_client;
pub mod tcpros;
pub mod topic_publisher;
pub mod xmlrpc;

pub use master_client::MasterClient;
pub use service_client::{RosServiceClient, ServiceClient, ServiceProxy};
pub use topic_publisher::{RostopicPublisher, VelocityCommand, VelocityPublisher};
