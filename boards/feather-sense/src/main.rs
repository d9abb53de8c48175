#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;

mod indicator;
mod microphone;
mod radio;
mod sensors;
mod storage;

use core::cell::RefCell;

use datalogger_core::{Acquisition, LoggerConfig, MicrophoneConfig};
use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::pdm::{self, Pdm};
use embassy_nrf::pwm::SequencePwm;
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::Delay;
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{SdCard, VolumeManager};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

use indicator::NeoPixel;
use radio::{NusRadio, Server};
use sensors::{Bmp280, Lsm6ds33, SenseSensors, Sht31};
use storage::{FixedClock, SdVolume, SdVolumeManager};

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
    PDM => pdm::InterruptHandler<peripherals::PDM>;
});

type I2cBus = Twim<'static>;

static I2C_BUS: StaticCell<RefCell<I2cBus>> = StaticCell::new();
static I2C_TX_BUFFER: StaticCell<[u8; 32]> = StaticCell::new();
static VOLUME_MANAGER: StaticCell<SdVolumeManager> = StaticCell::new();
static SERVER: StaticCell<Server> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Feather Sense datalogger starting...");

    // Priorities 0, 1 and 4 belong to the SoftDevice
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);
    interrupt::TWISPI0.set_priority(Priority::P3);
    interrupt::SPIM3.set_priority(Priority::P3);
    interrupt::PDM.set_priority(Priority::P3);

    let logger_config = LoggerConfig::default();

    // BLE stack, idle until the logger falls back to radio mode
    let sd = Softdevice::enable(&radio::softdevice_config());
    let server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(radio::softdevice_task(sd)));
    unwrap!(spawner.spawn(radio::gatt_task(server)));
    info!("SoftDevice enabled");

    // Sensors on the shared I2C bus (SDA P0.12, SCL P0.11)
    let mut i2c_config = twim::Config::default();
    i2c_config.frequency = twim::Frequency::K400;
    let twim = Twim::new(
        p.TWISPI0,
        Irqs,
        p.P0_12,
        p.P0_11,
        i2c_config,
        I2C_TX_BUFFER.init([0; 32]),
    );
    let bus = I2C_BUS.init(RefCell::new(twim));

    let sensors = SenseSensors {
        bmp280: unwrap!(Bmp280::new(
            RefCellDevice::new(bus),
            logger_config.sea_level_pressure_hpa
        )),
        sht31: unwrap!(Sht31::new(RefCellDevice::new(bus), Delay)),
        lsm6ds33: unwrap!(Lsm6ds33::new(RefCellDevice::new(bus))),
    };
    let mut aux = RefCellDevice::new(bus);
    unwrap!(sensors::enable_apds9960(&mut aux));
    unwrap!(sensors::enable_lis3mdl(&mut aux));
    info!("Sensors initialized");

    // Status NeoPixel on P0.16
    let pwm = unwrap!(SequencePwm::new_1ch(p.PWM0, p.P0_16, NeoPixel::pwm_config()));
    let pixel = NeoPixel::new(pwm, logger_config.indicator_brightness);

    // Microphone (CLK P0.01, DIN P0.00)
    let mut pdm = Pdm::new(
        p.PDM,
        Irqs,
        p.P0_01,
        p.P0_00,
        unwrap!(microphone::pdm_config(&MicrophoneConfig::default())),
    );
    microphone::check_level(&mut pdm).await;

    // Adalogger FeatherWing: SCK P0.14, MOSI P0.13, MISO P0.15, CS D10 (P0.27)
    let mut spi_config = spim::Config::default();
    spi_config.frequency = spim::Frequency::K250; // card init must stay below 400 kHz
    let spi = Spim::new(p.SPI3, Irqs, p.P0_14, p.P0_15, p.P0_13, spi_config);
    let cs = Output::new(p.P0_27, Level::High, OutputDrive::Standard);
    let spi_device = ExclusiveDevice::new(spi, cs, Delay).unwrap_or_else(|e| match e {});
    let card = SdCard::new(spi_device, Delay);
    let manager = VOLUME_MANAGER.init(VolumeManager::new(card, FixedClock));
    let mut volume = SdVolume::new(manager);

    let mut logger = Acquisition::new(sensors, pixel, Delay, logger_config);
    info!(
        "Logging to {} every {} ms",
        logger.config().storage_path,
        logger.config().sample_interval_ms
    );

    let err = logger.run(&mut volume, NusRadio::new(sd, server)).await;
    error!("Storage write failed, stopping: {}", err);
    defmt::panic!("Datalogger stopped");
}
