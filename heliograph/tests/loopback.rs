//! End-to-end exchange between a master station and a module station.
//!
//! The stations are joined by an in-memory radio: it decodes each side's
//! transmit requests, reports a transmit status back to the sender, and
//! delivers the payload to the other side as a receive frame, exactly the
//! translation a pair of modems performs over the air.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use heliograph::command::{discovery_probe, Opcode, Reading};
use heliograph::frame::{ApiFrame, TransmitStatus};
use heliograph::transport::Accumulator;
use heliograph::wire::{MasterRequest, ReceiveFrame, BROADCAST_ADDR, DEER_FEEDER_ID, MOD_ID};
use heliograph::{Link, Station};

const MASTER_ADDR: u64 = 0x0013a200_00000001;
const MODULE_ADDR: u64 = 0x0013a200_0000001a;
const BUDGET: usize = 256;

type Queue = Rc<RefCell<VecDeque<u8>>>;

struct PipeLink {
    rx: Queue,
    tx: Queue,
}

impl Link for PipeLink {
    type Error = std::convert::Infallible;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.tx.borrow_mut().extend(data.iter().copied());
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.borrow_mut().pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// One simulated radio cell with an endpoint on each side.
struct Radio {
    /// What each endpoint wrote toward its modem.
    uplinks: [(u64, Queue); 2],
    /// What each endpoint will read from its modem.
    downlinks: [Queue; 2],
    stages: [Accumulator; 2],
}

impl Radio {
    fn new() -> (Radio, PipeLink, PipeLink) {
        let queues: Vec<Queue> = (0..4)
            .map(|_| Rc::new(RefCell::new(VecDeque::new())))
            .collect();
        let master = PipeLink {
            rx: queues[0].clone(),
            tx: queues[1].clone(),
        };
        let module = PipeLink {
            rx: queues[2].clone(),
            tx: queues[3].clone(),
        };
        let radio = Radio {
            uplinks: [
                (MASTER_ADDR, queues[1].clone()),
                (MODULE_ADDR, queues[3].clone()),
            ],
            downlinks: [queues[0].clone(), queues[2].clone()],
            stages: [Accumulator::new(), Accumulator::new()],
        };
        (radio, master, module)
    }

    /// Moves every staged frame across the air once.
    fn pump(&mut self) {
        for side in 0..2 {
            let (source_addr, ref uplink) = self.uplinks[side];
            let bytes: Vec<u8> = uplink.borrow_mut().drain(..).collect();
            for byte in bytes {
                let frame = match self.stages[side].ingest(byte) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(err) => panic!("radio saw a bad frame: {}", err),
                };
                let request = match frame {
                    ApiFrame::TransmitRequest(request) => request,
                    other => panic!("endpoints only send transmit requests: {:?}", other),
                };

                // Status back to the sender.
                if request.frame_id != 0 {
                    let status = TransmitStatus {
                        frame_id: request.frame_id,
                        retry_count: 0,
                        delivery_status: 0,
                        discovery_status: 0,
                    }
                    .encode()
                    .unwrap();
                    self.downlinks[side].borrow_mut().extend(status.iter().copied());
                }

                // Payload to the other side.
                let broadcast = request.dest_addr == BROADCAST_ADDR;
                let peer = 1 - side;
                let (peer_addr, _) = self.uplinks[peer];
                if broadcast || request.dest_addr == peer_addr {
                    let opts = if broadcast { 0x02 } else { 0x01 };
                    let delivery = ReceiveFrame::new(source_addr, opts, &request.payload)
                        .unwrap()
                        .encode()
                        .unwrap();
                    self.downlinks[peer]
                        .borrow_mut()
                        .extend(delivery.iter().copied());
                }
            }
        }
    }
}

fn serve_one(radio: &mut Radio, module: &mut Station<PipeLink>) {
    let mut served = false;
    for _ in 0..BUDGET {
        match module.poll_request().unwrap() {
            Some((frame, request)) => {
                let opcode = Opcode::try_from(request.cmd).unwrap();
                let reading = match opcode {
                    Opcode::Ping => Reading::Pong { module_id: MOD_ID },
                    Opcode::TempHumidity => Reading::TempHumidity {
                        celsius: 21.5,
                        percent: 40.0,
                    },
                    other => panic!("test module does not serve {:?}", other),
                };
                module
                    .respond(&frame, &reading.encode().unwrap())
                    .unwrap();
                served = true;
                break;
            }
            None => continue,
        }
    }
    assert!(served, "module never saw the request");
    radio.pump();
}

#[test]
fn discovery_and_request_complete_end_to_end() {
    let (mut radio, master_link, module_link) = Radio::new();
    let mut master = Station::new_master(master_link);
    let mut module = Station::new_module(module_link, MOD_ID);

    // Discovery: broadcast ping, module answers with its id.
    let frame_id = master
        .send_request(BROADCAST_ADDR, &discovery_probe())
        .unwrap();
    radio.pump();
    let status = master.await_status(frame_id, BUDGET).unwrap();
    assert!(status.delivered());

    serve_one(&mut radio, &mut module);

    let reply = master.await_receive(BUDGET).unwrap();
    assert_eq!(reply.source_addr, MODULE_ADDR);
    assert!(reply.recv_opts.broadcast());
    assert_eq!(
        Reading::decode(Opcode::Ping, &reply.rf_data).unwrap(),
        Reading::Pong { module_id: MOD_ID }
    );

    // Directed request: sensor reading from the discovered module.
    let request = Opcode::TempHumidity.request(MOD_ID);
    let frame_id = master.send_request(MODULE_ADDR, &request).unwrap();
    radio.pump();
    master.await_status(frame_id, BUDGET).unwrap();

    serve_one(&mut radio, &mut module);

    let reply = master.await_receive(BUDGET).unwrap();
    assert!(reply.recv_opts.acknowledged());
    match Reading::decode(Opcode::TempHumidity, &reply.rf_data).unwrap() {
        Reading::TempHumidity { celsius, percent } => {
            assert_eq!(celsius, 21.5);
            assert_eq!(percent, 40.0);
        }
        other => panic!("unexpected reading: {:?}", other),
    }
}

#[test]
fn requests_for_another_module_are_ignored() {
    let (mut radio, master_link, module_link) = Radio::new();
    let mut master = Station::new_master(master_link);
    let mut module = Station::new_module(module_link, MOD_ID);

    let request = MasterRequest::new(DEER_FEEDER_ID, Opcode::Ping.into());
    master.send_request(MODULE_ADDR, &request).unwrap();
    radio.pump();

    for _ in 0..BUDGET {
        assert_eq!(module.poll_request().unwrap(), None);
    }
}
