//! # Messaging Flow
//!
//! Several clients share one [`MessageChannel`] but each owns its own
//! connection, as concurrent request/reply requires. A listener answers on
//! the other side. Replies must correlate with the request that caused them.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use rand::Rng;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tc_02_message_channel::{
        ChannelConfig, Endpoint, Message, MessageChannel, MessageListener, MAX_MESSAGE_LENGTH,
    };

    const ECHO: i32 = 21;
    const LOG_ONLY: i32 = 22;

    fn channel() -> Arc<MessageChannel> {
        Arc::new(MessageChannel::new(ChannelConfig {
            connect_timeout: Duration::from_secs(1),
            io_timeout: Duration::from_secs(5),
            ..ChannelConfig::default()
        }))
    }

    /// Replies with the request's sequence number followed by its payload;
    /// records fire-and-forget payloads.
    fn echo_listener(
        endpoint: &Endpoint,
        channel: Arc<MessageChannel>,
        log: Arc<Mutex<Vec<Vec<u8>>>>,
    ) -> MessageListener {
        MessageListener::bind(
            endpoint,
            channel,
            Arc::new(move |channel: &MessageChannel, message: Message| {
                match message.msg_type().get() {
                    ECHO => {
                        let mut answer = message.sequence().to_le_bytes().to_vec();
                        answer.extend_from_slice(message.payload().as_bytes());
                        channel.reply(&message, &answer).unwrap();
                    }
                    _ => log.lock().push(message.payload().as_bytes().to_vec()),
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_concurrent_clients_get_their_own_replies() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::Local(dir.path().join("echo.sock"));
        let channel = channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = echo_listener(&endpoint, Arc::clone(&channel), Arc::clone(&log));

        let clients: Vec<_> = (0..4)
            .map(|client| {
                let channel = Arc::clone(&channel);
                let endpoint = endpoint.clone();
                thread::spawn(move || {
                    let connection = channel.connect(&endpoint).unwrap();
                    let mut rng = rand::thread_rng();
                    for round in 0..25 {
                        let len = rng.gen_range(0..2048);
                        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

                        let mut message =
                            channel.create_message(ECHO, Arc::clone(&connection)).unwrap();
                        message.set_payload(&payload).unwrap();
                        let reply = channel.send(&mut message, true).unwrap().unwrap();

                        let bytes = reply.as_bytes();
                        assert_eq!(
                            &bytes[..4],
                            &message.sequence().to_le_bytes(),
                            "client {} round {}",
                            client,
                            round
                        );
                        assert_eq!(&bytes[4..], payload.as_slice());
                    }
                })
            })
            .collect();

        for client in clients {
            client.join().unwrap();
        }
        assert!(log.lock().is_empty());
        listener.stop();
    }

    #[test]
    fn test_fire_and_forget_then_request_over_tcp() {
        let channel = channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = echo_listener(
            &Endpoint::Remote {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            Arc::clone(&channel),
            Arc::clone(&log),
        );

        let connection = channel.connect(listener.local_endpoint()).unwrap();
        for i in 0..3u8 {
            let mut message = channel
                .create_message(LOG_ONLY, Arc::clone(&connection))
                .unwrap();
            message.set_payload(&[i; 16]).unwrap();
            assert!(channel.send(&mut message, false).unwrap().is_none());
        }

        // The session handles frames in order, so the echo arrives after the
        // three log-only frames have been recorded.
        let mut message = channel.create_message(ECHO, connection).unwrap();
        // The echo prefixes 4 bytes, landing exactly one byte under the limit.
        message.set_payload(&vec![7u8; MAX_MESSAGE_LENGTH - 5]).unwrap();
        let reply = channel.send(&mut message, true).unwrap().unwrap();
        assert_eq!(reply.len(), MAX_MESSAGE_LENGTH - 1);

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2], vec![2u8; 16]);
    }
}
