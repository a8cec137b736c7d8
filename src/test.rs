use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::prelude::*;
use crate::protocol::{Frame, TransferKind};
use crate::services::*;

type ResultLog<S> = Rc<RefCell<Vec<ServiceCallResult<S>>>>;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn string_request(s: &str) -> StringRequest {
    StringRequest {
        string_request: s.to_string(),
    }
}

/// A callback that records every result it sees
fn collector<S: ServiceType>() -> (ResultLog<S>, ServiceCallback<S>) {
    let log: ResultLog<S> = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let callback = ServiceCallback::new(move |result: &ServiceCallResult<S>| {
        sink.borrow_mut().push(result.clone());
    });
    (log, callback)
}

/// Node A (1) serves `StringService`, node B (2) is free to call it
fn setup() -> (InterlinkedNodes, ServiceServer<StringService>) {
    let nodes = InterlinkedNodes::new().unwrap();
    nodes.register_data_type::<StringService>().unwrap();

    let mut server = ServiceServer::<StringService>::new(&nodes.a);
    server
        .start(|request, response| {
            response.string_response = format!("Request string: {}", request.string_request);
        })
        .unwrap();

    (nodes, server)
}

#[test]
fn test_string_service_scenario() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut client_1 = ServiceClient::<StringService>::new(&nodes.b);
    let mut client_2 = ServiceClient::<StringService>::new(&nodes.b);
    let mut client_3 = ServiceClient::<StringService>::new(&nodes.b);

    client_1.set_callback(callback);
    client_2.set_callback(client_1.get_callback().unwrap());
    client_3.set_callback(client_1.get_callback().unwrap());
    client_3.set_request_timeout(ms(100));

    assert_eq!(1, nodes.a.num_service_request_listeners());
    assert_eq!(0, nodes.b.num_service_response_listeners());

    let call_1 = client_1.call(NodeId::new(1), &string_request("Hello world")).unwrap();
    let call_2 = client_2.call(NodeId::new(1), &string_request("Hello world")).unwrap();
    let call_3 = client_3.call(NodeId::new(99), &string_request("Hello world")).unwrap();
    assert_eq!(3, nodes.b.num_service_response_listeners());
    assert_ne!(call_1, call_2);

    nodes.spin_both(ms(20)).unwrap();

    assert_eq!(1, nodes.b.num_service_response_listeners());
    assert!(!client_1.has_pending_calls());
    assert!(!client_2.has_pending_calls());
    assert!(client_3.has_pending_calls());
    {
        let log = log.borrow();
        assert_eq!(2, log.len());
        assert_eq!(call_1, log[0].call_id());
        assert_eq!(call_2, log[1].call_id());
        for result in log.iter() {
            assert!(result.is_success());
            assert_eq!(NodeId::new(1), result.server_node_id());
            assert_eq!(
                "Request string: Hello world",
                result.response().unwrap().string_response
            );
        }
    }

    nodes.spin_both(ms(200)).unwrap();

    assert_eq!(0, nodes.b.num_service_response_listeners());
    assert!(!client_3.has_pending_calls());
    {
        let log = log.borrow();
        assert_eq!(3, log.len());
        assert_eq!(CallStatus::ErrorTimeout, log[2].status());
        assert_eq!(call_3, log[2].call_id());
        assert_eq!(NodeId::new(99), log[2].server_node_id());
        assert!(log[2].response().is_none());
    }

    client_3.call(NodeId::new(99), &string_request("Hello world")).unwrap();
    assert_eq!(1, nodes.b.num_service_response_listeners());

    drop(client_1);
    drop(client_2);
    drop(client_3);
    assert_eq!(0, nodes.b.num_service_response_listeners());
    assert_eq!(0, nodes.b.num_attached_clients());
    assert_eq!(3, log.borrow().len());
}

#[test]
fn test_suppressed_response_times_out() {
    let nodes = InterlinkedNodes::new().unwrap();
    nodes.register_data_type::<StringService>().unwrap();

    let mut server = ServiceServer::<StringService>::new(&nodes.a);
    server
        .start(|request, response| {
            if request.string_request == "ignore me" {
                response.set_response_enabled(false);
            } else {
                response.string_response = request.string_request.clone();
            }
        })
        .unwrap();

    let (log, callback) = collector::<StringService>();
    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.set_request_timeout(ms(50));

    let ignored = client.call(NodeId::new(1), &string_request("ignore me")).unwrap();
    let answered = client.call(NodeId::new(1), &string_request("answer me")).unwrap();

    nodes.spin_both(ms(20)).unwrap();
    assert_eq!(1, log.borrow().len());
    assert_eq!(answered, log.borrow()[0].call_id());
    assert!(client.is_pending(ignored));

    nodes.spin_both(ms(100)).unwrap();
    assert_eq!(2, log.borrow().len());
    assert_eq!(
        ServiceCallResult::ErrorTimeout { call_id: ignored },
        log.borrow()[1]
    );
    assert_eq!(0, server.response_failure_count());
    assert_eq!(0, nodes.b.num_service_response_listeners());
}

#[test]
fn test_empty_service() {
    let nodes = InterlinkedNodes::new().unwrap();
    nodes.register_data_type::<EmptyService>().unwrap();

    let mut server = ServiceServer::<EmptyService>::new(&nodes.a);
    server.start(|_, _| {}).unwrap();

    let (log, callback) = collector::<EmptyService>();
    let mut client = ServiceClient::<EmptyService>::new(&nodes.b);
    client.set_callback(callback);

    client.call(NodeId::new(1), &EmptyRequest {}).unwrap();
    nodes.spin_both(ms(20)).unwrap();

    assert_eq!(1, log.borrow().len());
    assert_eq!(Some(&EmptyResponse {}), log.borrow()[0].response());

    client.call(NodeId::new(1), &EmptyRequest {}).unwrap();
    client.call(NodeId::new(1), &EmptyRequest {}).unwrap();
    assert_eq!(2, nodes.b.num_service_response_listeners());

    drop(client);
    assert_eq!(0, nodes.b.num_service_response_listeners());

    // the responses still arrive, with nobody left to take them
    nodes.spin_both(ms(2000)).unwrap();
    assert_eq!(1, log.borrow().len());
}

#[test]
fn test_drop_idle_client() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut busy = ServiceClient::<StringService>::new(&nodes.b);
    busy.set_callback(callback.clone());
    busy.call(NodeId::new(99), &string_request("x")).unwrap();

    let mut idle = ServiceClient::<StringService>::new(&nodes.b);
    idle.set_callback(callback);
    drop(idle);

    assert_eq!(1, nodes.b.num_service_response_listeners());
    assert!(busy.has_pending_calls());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_drop_client_with_pending_calls() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.set_request_timeout(ms(10));
    for _ in 0..3 {
        client.call(NodeId::new(99), &string_request("x")).unwrap();
    }
    assert_eq!(3, nodes.b.num_service_response_listeners());

    drop(client);
    assert_eq!(0, nodes.b.num_service_response_listeners());

    nodes.spin_both(ms(100)).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_one_server_per_type() {
    let (nodes, mut server) = setup();

    let mut other = ServiceServer::<StringService>::new(&nodes.a);
    assert_eq!(
        Err(ServiceError::ServerAlreadyRegistered(StringService::FULL_NAME.to_string())),
        other.start(|_, _| {})
    );
    assert!(!other.is_started());
    assert_eq!(1, nodes.a.num_service_request_listeners());

    server.stop();
    assert!(!server.is_started());
    assert_eq!(0, nodes.a.num_service_request_listeners());

    other
        .start(|_, response| {
            response.string_response = "other".to_string();
        })
        .unwrap();
    assert_eq!(1, nodes.a.num_service_request_listeners());

    let (log, callback) = collector::<StringService>();
    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.call(NodeId::new(1), &string_request("x")).unwrap();
    nodes.spin_both(ms(20)).unwrap();

    assert_eq!("other", log.borrow()[0].response().unwrap().string_response);

    drop(other);
    assert_eq!(0, nodes.a.num_service_request_listeners());
}

#[test]
fn test_start_again_replaces_handler() {
    let (nodes, mut server) = setup();
    server
        .start(|_, response| {
            response.string_response = "replaced".to_string();
        })
        .unwrap();
    assert_eq!(1, nodes.a.num_service_request_listeners());

    let (log, callback) = collector::<StringService>();
    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.call(NodeId::new(1), &string_request("x")).unwrap();
    nodes.spin_both(ms(20)).unwrap();

    assert_eq!("replaced", log.borrow()[0].response().unwrap().string_response);
}

#[test]
fn test_pending_table_full() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService, 1>::new(&nodes.b);
    client.set_callback(callback);
    assert_eq!(1, client.capacity());

    client.call(NodeId::new(1), &string_request("first")).unwrap();
    assert_eq!(
        Err(ServiceError::PendingTableFull(1)),
        client.call(NodeId::new(1), &string_request("second"))
    );
    assert_eq!(1, nodes.b.num_service_response_listeners());

    nodes.spin_both(ms(20)).unwrap();
    assert_eq!(1, log.borrow().len());

    client.call(NodeId::new(1), &string_request("second")).unwrap();
    assert_eq!(1, client.num_pending_calls());
}

#[test]
fn test_transfer_ids_exhausted() {
    let (nodes, _server) = setup();
    let (_log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService, 40>::new(&nodes.b);
    client.set_callback(callback);

    for _ in 0..32 {
        client.call(NodeId::new(99), &string_request("x")).unwrap();
    }
    assert_eq!(
        Err(ServiceError::NoTransferIdAvailable),
        client.call(NodeId::new(99), &string_request("x"))
    );
    assert_eq!(32, nodes.b.num_service_response_listeners());

    // transfer IDs are counted per destination
    client.call(NodeId::new(1), &string_request("x")).unwrap();
    assert_eq!(33, client.num_pending_calls());
}

#[test]
fn test_invalid_destination() {
    let (nodes, _server) = setup();
    let (_log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);

    assert_eq!(
        Err(ServiceError::InvalidNodeId(0)),
        client.call(NodeId::BROADCAST, &string_request("x"))
    );
    assert_eq!(
        Err(ServiceError::InvalidNodeId(128)),
        client.call(NodeId::new(128), &string_request("x"))
    );
    assert_eq!(
        Err(ServiceError::InvalidNodeId(2)),
        client.call(nodes.b.node_id(), &string_request("x"))
    );
    assert_eq!(0, nodes.b.num_service_response_listeners());
    assert!(!client.has_pending_calls());
}

#[test]
fn test_call_without_callback() {
    let (nodes, _server) = setup();
    let mut client = ServiceClient::<StringService>::new(&nodes.b);

    assert!(client.get_callback().is_none());
    assert_eq!(
        Err(ServiceError::CallbackNotSet),
        client.call(NodeId::new(1), &string_request("x"))
    );
    assert_eq!(0, nodes.b.num_service_response_listeners());
}

#[test]
fn test_call_unregistered_type() {
    let (nodes, _server) = setup();
    let (_log, callback) = collector::<EmptyService>();

    let mut client = ServiceClient::<EmptyService>::new(&nodes.b);
    client.set_callback(callback);

    assert_eq!(
        Err(ServiceError::UnknownDataType(EmptyService::FULL_NAME.to_string())),
        client.call(NodeId::new(1), &EmptyRequest {})
    );

    let mut server = ServiceServer::<EmptyService>::new(&nodes.a);
    assert!(server.start(|_, _| {}).is_err());
}

#[test]
fn test_transport_rejects_oversized_request() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);

    let result = client.call(NodeId::new(1), &string_request(&"x".repeat(300)));
    assert!(matches!(result, Err(ServiceError::TransportRejected(_))));
    assert_eq!(0, nodes.b.num_service_response_listeners());
    assert!(!client.has_pending_calls());

    nodes.spin_both(ms(2000)).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_response_in_deadline_tick_is_success() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.set_request_timeout(ms(10));
    client.call(NodeId::new(1), &string_request("late")).unwrap();

    // nobody spins until the deadline has been reached
    nodes.clock().advance(ms(10));
    nodes.a.spin_once().unwrap();
    nodes.b.spin_once().unwrap();

    assert_eq!(1, log.borrow().len());
    assert!(log.borrow()[0].is_success());
}

#[test]
fn test_timeout_clamped() {
    let (nodes, _server) = setup();
    let mut client = ServiceClient::<StringService>::new(&nodes.b);

    assert_eq!(crate::client::DEFAULT_REQUEST_TIMEOUT, client.request_timeout());
    client.set_request_timeout(Duration::ZERO);
    assert_eq!(crate::client::MIN_REQUEST_TIMEOUT, client.request_timeout());
    client.set_request_timeout(Duration::from_secs(3600));
    assert_eq!(crate::client::MAX_REQUEST_TIMEOUT, client.request_timeout());
}

#[test]
fn test_shared_callback_reports_each_call_once() {
    let (nodes, _server) = setup();
    let (log, callback) = collector::<StringService>();

    let mut clients: Vec<ServiceClient<StringService>> = (0..3)
        .map(|_| ServiceClient::<StringService>::new(&nodes.b))
        .collect();

    let mut call_ids = vec![];
    for client in clients.iter_mut() {
        client.set_callback(callback.clone());
        client.set_request_timeout(ms(30));
        call_ids.push(client.call(NodeId::new(1), &string_request("a")).unwrap());
        call_ids.push(client.call(NodeId::new(99), &string_request("b")).unwrap());
    }
    assert!(clients[0].get_callback().unwrap().ptr_eq(&callback));

    nodes.spin_both(ms(1000)).unwrap();

    let log = log.borrow();
    assert_eq!(call_ids.len(), log.len());
    for call_id in call_ids.iter() {
        let results: Vec<_> = log.iter().filter(|result| result.call_id() == *call_id).collect();
        assert_eq!(1, results.len());
        assert_eq!(call_id.server_node_id == NodeId::new(1), results[0].is_success());
    }
    assert_eq!(0, nodes.b.num_service_response_listeners());
    assert_eq!(0, nodes.b.num_attached_clients());
}

#[test]
fn test_call_from_callback() {
    let (nodes, _server) = setup();
    let log: ResultLog<StringService> = Rc::new(RefCell::new(Vec::new()));

    let client = Rc::new(RefCell::new(ServiceClient::<StringService>::new(&nodes.b)));
    let this = Rc::downgrade(&client);
    let sink = log.clone();
    client
        .borrow_mut()
        .set_callback(ServiceCallback::new(move |result: &ServiceCallResult<StringService>| {
            sink.borrow_mut().push(result.clone());
            if sink.borrow().len() < 3 {
                if let Some(client) = this.upgrade() {
                    client.borrow_mut().call(NodeId::new(1), &string_request("again")).unwrap();
                }
            }
        }));

    client.borrow_mut().call(NodeId::new(1), &string_request("first")).unwrap();
    nodes.spin_both(ms(50)).unwrap();

    assert_eq!(3, log.borrow().len());
    assert!(log.borrow().iter().all(|result| result.is_success()));
    assert!(!client.borrow().has_pending_calls());
    assert_eq!(0, nodes.b.num_service_response_listeners());
}

#[test]
fn test_malformed_response_times_out() {
    let (nodes, _server) = setup();
    let mut rogue = nodes.bus().connect(NodeId::new(3)).unwrap();
    let (log, callback) = collector::<StringService>();

    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.set_request_timeout(ms(50));
    let call_id = client.call(NodeId::new(3), &string_request("x")).unwrap();

    let request = rogue.receive().unwrap().unwrap();
    assert_eq!(TransferKind::Request, request.kind);
    rogue
        .send(Frame {
            source: NodeId::new(3),
            destination: request.source,
            data_type_id: request.data_type_id,
            transfer_id: request.transfer_id,
            kind: TransferKind::Response,
            payload: vec![0xff_u8].into(),
        })
        .unwrap();

    nodes.spin_both(ms(20)).unwrap();
    assert!(log.borrow().is_empty());
    assert!(client.is_pending(call_id));

    nodes.spin_both(ms(100)).unwrap();
    assert_eq!(
        ServiceCallResult::ErrorTimeout { call_id },
        log.borrow()[0]
    );
}

#[test]
fn test_malformed_request_is_counted() {
    let (nodes, server) = setup();
    let mut rogue = nodes.bus().connect(NodeId::new(3)).unwrap();
    let data_type_id = nodes.a.data_type_id::<StringService>().unwrap();

    rogue
        .send(Frame {
            source: NodeId::new(3),
            destination: NodeId::new(1),
            data_type_id,
            transfer_id: TransferId::new(7),
            kind: TransferKind::Request,
            payload: vec![0xff_u8].into(),
        })
        .unwrap();
    nodes.spin_both(ms(5)).unwrap();

    assert_eq!(1, server.request_failure_count());
    assert_eq!(None, rogue.receive().unwrap());
}

#[test]
fn test_late_response_after_timeout_is_dropped() {
    let nodes = InterlinkedNodes::new().unwrap();
    nodes.register_data_type::<StringService>().unwrap();
    let served = Rc::new(Cell::new(0));

    let mut server = ServiceServer::<StringService>::new(&nodes.a);
    let counter = served.clone();
    server
        .start(move |_, _| counter.set(counter.get() + 1))
        .unwrap();

    let (log, callback) = collector::<StringService>();
    let mut client = ServiceClient::<StringService>::new(&nodes.b);
    client.set_callback(callback);
    client.set_request_timeout(ms(5));
    client.call(NodeId::new(1), &string_request("x")).unwrap();

    // the call expires on node B before node A ever looks at the request
    nodes.clock().advance(ms(5));
    nodes.b.spin_once().unwrap();
    nodes.a.spin_once().unwrap();
    nodes.b.spin_once().unwrap();

    assert_eq!(1, served.get());
    assert_eq!(1, log.borrow().len());
    assert_eq!(CallStatus::ErrorTimeout, log.borrow()[0].status());
}
