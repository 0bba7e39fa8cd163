use std::sync::{Arc, Mutex};

use uprpc::{CallableConn, Result, UMessage, UTransport, UUri};

/// In-process transport double.
///
/// Records every sent message and routes deliveries to registered listeners
/// by wildcard filter match. With loopback enabled, sent messages are
/// delivered straight back through the listener table, which wires a client
/// and a server together over one transport instance.
pub struct MockTransport {
    local: UUri,
    loopback: bool,
    sent: Mutex<Vec<UMessage>>,
    listeners: Mutex<Vec<Registration>>,
}

struct Registration {
    source_filter: UUri,
    sink_filter: Option<UUri>,
    conn: CallableConn,
}

impl MockTransport {
    pub fn create(local: UUri) -> Arc<Self> {
        Arc::new(Self {
            local,
            loopback: false,
            sent: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn create_loopback(local: UUri) -> Arc<Self> {
        Arc::new(Self {
            local,
            loopback: true,
            sent: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<UMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|registration| registration.conn.is_connected());
        listeners.len()
    }

    /// Routes `message` to every listener whose filters match, as a broker
    /// would.
    pub fn deliver(&self, message: &UMessage) {
        let matching: Vec<CallableConn> = {
            let mut listeners = self.listeners.lock().unwrap();
            listeners.retain(|registration| registration.conn.is_connected());
            listeners
                .iter()
                .filter(|registration| registration.matches(message))
                .map(|registration| registration.conn.clone())
                .collect()
        };
        for conn in matching {
            conn.call(message.clone());
        }
    }
}

impl Registration {
    fn matches(&self, message: &UMessage) -> bool {
        if !self.source_filter.matches(&message.attributes.source) {
            return false;
        }
        match (&self.sink_filter, &message.attributes.sink) {
            (None, _) => true,
            (Some(filter), Some(sink)) => filter.matches(sink),
            (Some(_), None) => false,
        }
    }
}

impl UTransport for MockTransport {
    fn local_uri(&self) -> &UUri {
        &self.local
    }

    fn do_send(&self, message: &UMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.loopback {
            self.deliver(message);
        }
        Ok(())
    }

    fn do_register_listener(
        &self,
        source_filter: &UUri,
        sink_filter: Option<&UUri>,
        listener: CallableConn,
    ) -> Result<()> {
        self.listeners.lock().unwrap().push(Registration {
            source_filter: source_filter.clone(),
            sink_filter: sink_filter.cloned(),
            conn: listener,
        });
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn method_uri() -> UUri {
    UUri::new("vehicle", 0x10001, 2, 0x00AB)
}

pub fn client_uri() -> UUri {
    UUri::new("vehicle", 0x20002, 1, 0)
}
