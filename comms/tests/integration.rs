use std::num::NonZeroUsize;

use comms::{
    msg::{Command, Msg, Payload},
    specs::{
        machine_learning::{LayerSpec, LocalTrainingSpec, ModelSpec, ParamsSpec},
        worker::WorkerSpec,
    },
};
use tokio::io;

#[tokio::test]
async fn send_recv_control() {
    const SIZE: usize = 1024;

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let spec = WorkerSpec {
        worker_id: 3,
        model: ModelSpec::Sequential {
            layers: vec![LayerSpec::Dense { dim: (4, 2) }, LayerSpec::Relu],
        },
        training: LocalTrainingSpec {
            epochs: NonZeroUsize::new(2).unwrap(),
            batch_size: NonZeroUsize::new(32).unwrap(),
            learning_rate: 0.01,
            seed: Some(7),
        },
    };

    tx.send(&Msg::Control(Command::CreateWorker(spec.clone())))
        .await
        .unwrap();

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let mut rx_buf = vec![0u32; 16];
    match rx.recv_into(&mut rx_buf).await.unwrap() {
        Msg::Control(Command::CreateWorker(got)) => assert_eq!(got, spec),
        other => panic!("unexpected msg: {other:?}"),
    }
}

#[tokio::test]
async fn send_recv_params_after_layout() {
    const SIZE: usize = 4096;

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let layout = ParamsSpec {
        shapes: vec![vec![2, 2], vec![2]],
    };
    let params = [1.0_f32, -2.0, 3.5, 0.25, 10.0, -0.5];

    tx.send(&Msg::Control(Command::LocalUpdate(layout.clone())))
        .await
        .unwrap();
    tx.send(&Msg::Data(Payload::Params(&params))).await.unwrap();

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);
    let mut rx_buf: Vec<f32> = Vec::new();

    let got_layout = match rx.recv_into(&mut rx_buf).await.unwrap() {
        Msg::Control(Command::LocalUpdate(spec)) => spec,
        other => panic!("unexpected msg: {other:?}"),
    };
    assert_eq!(got_layout, layout);

    match rx.recv_into(&mut rx_buf).await.unwrap() {
        Msg::Data(Payload::Params(got)) => {
            assert_eq!(got.len(), params.len());
            assert_eq!(got, params);
        }
        other => panic!("unexpected msg: {other:?}"),
    }
}

#[tokio::test]
async fn send_recv_labels() {
    let (one, two) = io::duplex(256);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let labels = [0_u32, 9, 4, 4, 1];
    tx.send(&Msg::Data(Payload::Labels(&labels))).await.unwrap();

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);
    let mut rx_buf = vec![0i32; 4];

    match rx.recv_into(&mut rx_buf).await.unwrap() {
        Msg::Data(Payload::Labels(got)) => assert_eq!(got, labels),
        other => panic!("unexpected msg: {other:?}"),
    }
}

#[tokio::test]
async fn frames_over_the_limit_are_rejected() {
    let (one, two) = io::duplex(4096);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let params = [0.0_f32; 64];
    tx.send(&Msg::Data(Payload::Params(&params))).await.unwrap();

    let (rx, tx) = io::split(two);
    let (rx, _) = comms::channel(rx, tx);
    let mut rx = rx.with_max_frame_len(128);

    let mut rx_buf: Vec<f32> = Vec::new();
    let err = rx.recv_into::<Msg, _>(&mut rx_buf).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}
