#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::fmt::Write as _;

use embassy_executor::Spawner;
use embassy_time::Timer;
use embedded_graphics::geometry::Size;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use rtt_target::rprintln;
use static_cell::StaticCell;

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use hygro_core::display::{DisplayPresenter, Presenter};
use hygro_core::pipeline::{effective_interval_ms, run_cycle, run_join_phase};
use hygro_firmware::publisher::{NetBuffers, NetworkPublisher};
use hygro_firmware::sensor::Sht40Sensor;
use hygro_firmware::tls::HalRng;
use hygro_firmware::{secrets, wifi};

const DISPLAY_WIDTH: u16 = 320;
const DISPLAY_HEIGHT: u16 = 240;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();
static NET_BUFFERS: StaticCell<NetBuffers> = StaticCell::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    rprintln!("Embassy initialized!");

    let Some(device_config) = secrets::device_config() else {
        rprintln!("Certificate fingerprint in the build environment is malformed; refusing to run");
        halt().await
    };

    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (mut wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");
    wifi_controller
        .set_config(&wifi::station_config(&device_config.internet))
        .expect("Failed to apply station configuration");

    // Configure and initialize the display

    // 1. Configure SPI bus
    let spi_bus = Spi::new(peripherals.SPI2, Config::default())
        .unwrap()
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO37);

    // 2. Create a dummy CS pin (we don't use hardware CS for this display)
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());

    // 3. Wrap the SPI bus as a SPI device (required by embedded-hal traits)
    let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).unwrap();

    // 4. Set up DC (Data/Command) pin
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());

    // 5. Create a buffer for SPI batching (larger = faster, uses more RAM)
    let mut spi_buffer = [0u8; 64];

    // 6. Create display interface
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);

    // 7. Build and initialize the display driver
    let display = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut embassy_time::Delay)
        .expect("Failed to initialize display");

    rprintln!("Display initialized!");

    let mut presenter = DisplayPresenter::new(
        display,
        Size::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32),
    );
    if let Err(e) = presenter.show_startup_status("Starting") {
        rprintln!("Startup screen render failed: {:?}", e);
    }

    let i2c = I2c::new(peripherals.I2C0, I2cConfig::default())
        .expect("Failed to initialize I2C bus")
        .with_sda(peripherals.GPIO12)
        .with_scl(peripherals.GPIO11)
        .into_async();
    let mut sensor = Sht40Sensor::new(i2c);

    let mut rng = Rng::new();
    let seed = ((rng.random() as u64) << 32) | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        seed,
    );
    spawner.spawn(wifi::net_task(runner)).expect("net task");

    let mut driver = wifi::WifiJoinDriver::new(spawner, wifi_controller, stack);
    let joined = run_join_phase(
        &mut driver,
        &mut presenter,
        &mut embassy_time::Delay,
        device_config.schedule.join_poll_interval_ms as u32,
    )
    .await;
    if joined.is_err() {
        // Terminal by contract; the failure screen is already up.
        halt().await
    }

    if let Some(v4) = stack.config_v4() {
        let mut line: heapless::String<48> = heapless::String::new();
        let _ = write!(line, "Connected: {}", v4.address);
        if let Err(e) = presenter.show_startup_status(&line) {
            rprintln!("Address screen render failed: {:?}", e);
        }
    }

    let buffers = NET_BUFFERS.init(NetBuffers::new());
    let mut publisher =
        NetworkPublisher::new(stack, &device_config.api, HalRng::new(rng), buffers);
    publisher.enable_reuse();

    match publisher.row_count().await {
        Ok(count) => log::info!("remote table currently reports {count} rows"),
        Err(err) => log::warn!("row count check failed: {err}"),
    }

    let interval_ms = effective_interval_ms(
        device_config.schedule.publish_interval_ms,
        hygro_firmware::sensor::MIN_SAMPLE_INTERVAL_MS,
    );

    loop {
        let outcome = run_cycle(&mut sensor, &mut presenter, &mut publisher).await;
        log::debug!("cycle finished: {outcome:?}");
        Timer::after_millis(interval_ms).await;
    }
}

async fn halt() -> ! {
    loop {
        Timer::after_secs(1).await;
    }
}
