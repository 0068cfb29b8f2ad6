use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Timer};
use log::info;
use static_cell::StaticCell;
use superbutton_service::{
    dispatch_capacity, ClickEvent, Config, Engine, PinId, PullDirection, PullMode, RawLevel, Registration, Service,
    Tag,
};

const BUTTONS: usize = 2;
const DISPATCH: usize = dispatch_capacity(BUTTONS);

type ButtonService = Service<CriticalSectionRawMutex, BUTTONS, DISPATCH>;

static SERVICE: StaticCell<ButtonService> = StaticCell::new();
static EVENTS: Channel<CriticalSectionRawMutex, ClickEvent, 16> = Channel::new();

/// Mock pin that stands in for interrupt handlers
mod device {
    use embassy_time::Timer;
    use superbutton_service::{Capture, RawLevel};

    pub struct Device {
        capture: Capture<'static>,
        index: u8,
    }

    impl Device {
        pub fn new(capture: Capture<'static>, index: u8) -> Self {
            Self { capture, index }
        }

        /// Pull-up wiring, pressing drives the pin low. Every edge bounces once.
        async fn edge(&self, level: RawLevel, bounce: RawLevel) {
            self.capture.on_edge(self.index, level);
            Timer::after_millis(3).await;
            self.capture.on_edge(self.index, bounce);
            Timer::after_millis(2).await;
            self.capture.on_edge(self.index, level);
        }

        pub async fn click(&self, held_ms: u64) {
            self.edge(RawLevel::Low, RawLevel::High).await;
            Timer::after_millis(held_ms).await;
            self.edge(RawLevel::High, RawLevel::Low).await;
        }
    }
}

#[embassy_executor::task]
async fn engine(mut engine: Engine<'static, 'static, CriticalSectionRawMutex, BUTTONS, DISPATCH>) {
    engine.run().await
}

#[embassy_executor::task]
async fn host() {
    info!("Host task");
    loop {
        let event = EVENTS.receive().await;
        info!(
            "Pin {} (tag {}): {:?} x{} after {} ms",
            event.pin.0,
            event.tag.0,
            event.kind,
            event.click_count,
            event.duration.as_millis()
        );
    }
}

#[embassy_executor::task]
async fn device(service: &'static ButtonService) {
    let a = device::Device::new(service.capture(), service.index(PinId(0)).unwrap());
    let b = device::Device::new(service.capture(), service.index(PinId(1)).unwrap());

    loop {
        info!("Single click on pin 0");
        a.click(60).await;
        Timer::after_secs(1).await;

        info!("Triple click on pin 1");
        for _ in 0..3 {
            b.click(40).await;
            Timer::after_millis(60).await;
        }
        Timer::after_secs(1).await;

        info!("Long press on pin 0");
        a.click(1500).await;
        Timer::after_secs(1).await;

        info!("Pin levels: {:?} {:?}", service.level(PinId(0)), service.level(PinId(1)));
    }
}

#[embassy_executor::task]
async fn run(spawner: Spawner) {
    let buttons = [
        Registration::new(PinId(0), Tag(0xA)),
        Registration::new(PinId(1), Tag(0xB)),
    ];
    let service: &'static ButtonService = SERVICE.init(
        Service::new(&buttons, PullMode::Chip, PullDirection::Up, Config::default()).unwrap(),
    );
    info!("Enable internal pull: {:?}", service.internal_pull());

    let mut consumer = service.engine(EVENTS.dyn_sender()).unwrap();
    // Both buttons read released at boot
    for button in service.buttons() {
        consumer.prime(button.pin, RawLevel::High, Instant::now()).unwrap();
    }

    spawner.must_spawn(engine(consumer));
    spawner.must_spawn(host());
    spawner.must_spawn(device(service));
}

fn main() {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    static EXECUTOR: StaticCell<Executor> = StaticCell::new();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(run(spawner));
    });
}
