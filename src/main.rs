use element_node::config::{self, Config};
use element_node::instance_lock::InstanceLock;
use element_node::node::Node;
use element_node::simulation::SimulatedBoard;
use log::{error, info};

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();
    info!("Starting element node");

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    info!("Configuration loaded:");
    info!("  Device Name: {}", config.node.device_name);
    info!("  Layout: {}", config.node.layout);
    info!("  Switch polarity: active {}", if config.node.switch_active_low { "low" } else { "high" });
    info!("  Sensor poll: {}s", config.node.sensor_poll_interval_secs);

    // Refuse to drive the same lines twice
    let _lock = match InstanceLock::acquire(&config.node.device_name) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Bind the layout to the simulated board
    let mut board = SimulatedBoard::new();
    let registry = match config.node.layout.build(
        &config.node.device_name,
        &mut board,
        config.node.switch_active_low,
    ) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to assemble layout: {}", e);
            std::process::exit(1);
        }
    };

    let mut node = Node::new(registry, config.node.sensor_poll_interval_secs);
    if let Err(e) = node.init() {
        error!("Failed to initialise peripherals: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = node.run(&config).await {
        error!("Node stopped: {}", e);
        std::process::exit(1);
    }

    info!("Element node stopped");
}
