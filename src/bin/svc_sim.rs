use std::time::Duration;
use clap::{command, Parser};
use serde::Serialize;
use uavcan_service::prelude::*;
use uavcan_service::services::*;

#[derive(Parser)]
#[command(version = "1.0", author = "Felix Watts", about = "Runs StringService calls between two simulated nodes and reports every result as a JSON line.")]
struct Cli {
    /// Request string sent with every call
    #[arg(short, long, default_value = "Hello world")]
    request: String,
    /// Node IDs to call, one call each. The server runs on node 1.
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![1u8, 1, 99])]
    targets: Vec<u8>,
    #[arg(long, default_value_t = 100)]
    timeout_ms: u64,
    /// Simulated time to run for
    #[arg(long, default_value_t = 500)]
    spin_ms: u64,
    /// Make the server stay silent
    #[arg(long)]
    suppress: bool,
}

#[derive(Serialize)]
struct Report {
    status: CallStatus,
    server_node_id: u8,
    transfer_id: u8,
    response: Option<String>,
    elapsed_ms: u128,
}

fn main() {
    if let Err(e) = run() {
        println!("{}", &e.to_string());
    }
}

fn run() -> ServiceResult<()> {
    let cli = Cli::parse();

    let nodes = InterlinkedNodes::new()?;
    nodes.register_data_type::<StringService>()?;

    let suppress = cli.suppress;
    let mut server = ServiceServer::<StringService>::new(&nodes.a);
    server.start(move |request, response| {
        if suppress {
            response.set_response_enabled(false);
        } else {
            response.string_response = format!("Request string: {}", request.string_request);
        }
    })?;

    let clock = nodes.clock().clone();
    let callback = ServiceCallback::new(move |result: &ServiceCallResult<StringService>| {
        let report = Report {
            status: result.status(),
            server_node_id: result.server_node_id().get(),
            transfer_id: result.call_id().transfer_id.get(),
            response: result.response().map(|response| response.string_response.clone()),
            elapsed_ms: clock.now().as_millis(),
        };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("{}", e),
        }
    });

    let request = StringRequest { string_request: cli.request };
    let mut clients = vec![];
    for target in cli.targets {
        let mut client = ServiceClient::<StringService>::new(&nodes.b);
        client.set_callback(callback.clone());
        client.set_request_timeout(Duration::from_millis(cli.timeout_ms));
        client.call(NodeId::new(target), &request)?;
        clients.push(client);
    }

    nodes.spin_both(Duration::from_millis(cli.spin_ms))?;

    let abandoned: usize = clients.iter().map(|client| client.num_pending_calls()).sum();
    if abandoned > 0 {
        eprintln!("{} calls still pending after {} ms", abandoned, cli.spin_ms);
    }

    Ok(())
}
