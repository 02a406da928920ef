//! Session setup for the D3DKMT layer.
//!
//! A [`Session`] owns the OS handle space, runs the broker on its own task
//! and hands out one [`HandleManager`] per simulated process.

#![deny(unused_must_use)]

#[macro_use]
extern crate log;

use {
    async_std::task::{self, JoinHandle},
    futures::{
        channel::{mpsc, oneshot},
        StreamExt,
    },
    kmt_hal::{enumerate_gpus, GpuEnumerator, GpuInfo, HandleSpace},
    kmt_object::{
        ipc::{BrokerTransport, LoopbackBroker, MessagePacket},
        Config, HandleManager, KmtError, KmtResult,
    },
    std::sync::Arc,
};

pub use kmt_syscall::Syscall;

type BrokerCall = (MessagePacket, oneshot::Sender<KmtResult<MessagePacket>>);

/// 通过 channel 把请求转交给 broker 任务
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<BrokerCall>,
}

impl BrokerTransport for ChannelTransport {
    fn call(&self, request: MessagePacket) -> KmtResult<MessagePacket> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .unbounded_send((request, reply_tx))
            .map_err(|_| KmtError::BROKER_UNAVAILABLE)?;
        task::block_on(reply_rx).map_err(|_| KmtError::BROKER_UNAVAILABLE)?
    }
}

async fn run_broker(broker: Arc<LoopbackBroker>, mut calls: mpsc::UnboundedReceiver<BrokerCall>) {
    info!("broker started");
    while let Some((request, reply)) = calls.next().await {
        if reply.send(broker.serve(request)).is_err() {
            warn!("broker client went away before the reply");
        }
    }
    info!("broker stopped");
}

/// A set of simulated processes sharing one handle space and broker.
pub struct Session {
    config: Config,
    space: Arc<dyn HandleSpace>,
    broker: Arc<LoopbackBroker>,
    sender: mpsc::UnboundedSender<BrokerCall>,
    task: Option<JoinHandle<()>>,
    gpu: Option<Arc<dyn GpuEnumerator>>,
}

impl Session {
    /// Start a session: install the logger and spawn the broker task.
    pub fn new(config: Config) -> Self {
        kmt_hal_unix::logging::init();
        let space = kmt_hal_unix::handle_space();
        let broker = LoopbackBroker::new(space.clone());
        let (sender, calls) = mpsc::unbounded();
        let task = task::spawn(run_broker(broker.clone(), calls));
        Session {
            config,
            space,
            broker,
            sender,
            task: Some(task),
            gpu: None,
        }
    }

    /// Look adapters up in `gpu` from now on.
    pub fn with_gpu(mut self, gpu: Arc<dyn GpuEnumerator>) -> Self {
        self.gpu = Some(gpu);
        self
    }

    /// Create the handle manager of a new process.
    pub fn spawn_process(&self) -> HandleManager {
        let transport = Arc::new(ChannelTransport {
            sender: self.sender.clone(),
        });
        let manager = HandleManager::new(self.config.clone(), self.space.clone(), transport);
        match &self.gpu {
            Some(gpu) => manager.with_gpu(gpu.clone()),
            None => manager,
        }
    }

    pub fn broker(&self) -> &Arc<LoopbackBroker> {
        &self.broker
    }

    pub fn handle_space(&self) -> &Arc<dyn HandleSpace> {
        &self.space
    }

    /// GPUs of the session, discrete ones first.
    pub fn gpus(&self) -> Vec<GpuInfo> {
        let gpu = match &self.gpu {
            Some(gpu) => gpu,
            None => return Vec::new(),
        };
        enumerate_gpus(gpu.as_ref()).unwrap_or_else(|_| {
            warn!("failed to enumerate GPUs");
            Vec::new()
        })
    }

    /// Stop the broker and wait for its task to finish.
    ///
    /// Managers still alive fail their broker calls with `BROKER_UNAVAILABLE`.
    pub async fn shutdown(mut self) {
        self.sender.close_channel();
        if let Some(task) = self.task.take() {
            task.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.sender.close_channel();
    }
}
