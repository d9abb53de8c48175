#![deny(warnings)]
//! BLE Nordic UART Service (NUS) over the S140 SoftDevice
//!
//! Implements `StreamingRadio` for a single peripheral-role connection.
//!
//! # Task split
//!
//! The SoftDevice event loop and the GATT server each need a future polled
//! for as long as the radio is in use, so they run in their own tasks:
//! - `softdevice_task` runs `Softdevice::run()` forever
//! - `gatt_task` serves GATT requests for the current connection, handed
//!   over through [`GATT_CONNECTION`], until the peer disconnects
//!
//! The acquisition loop only ever talks to [`NusRadio`].
//!
//! # Framing
//!
//! One record is one `send()`. Notifications carry at most
//! [`NOTIFY_CHUNK`] bytes (default ATT MTU), so a record is split across
//! consecutive notifications; NUS clients reassemble on the newline.

#![allow(unsafe_code)] // Required for the SoftDevice raw configuration structs

use datalogger_hal::StreamingRadio;
use defmt::{debug, info, warn, Format};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::gatt_server::NotifyValueError;
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};

/// Payload bytes per notification with the default 23-byte ATT MTU
pub const NOTIFY_CHUNK: usize = 20;

/// Advertised name, also the GAP device name
pub const DEVICE_NAME: &str = "Feather Sense";

/// NUS service UUID 6e400001-b5a3-f393-e0a9-e50e24dcca9e, little-endian
const NUS_UUID: [u8; 16] = [
    0x9e, 0xca, 0xdc, 0x24, 0x0e, 0xe5, 0xa9, 0xe0, 0x93, 0xf3, 0xa3, 0xb5, 0x01, 0x00, 0x40, 0x6e,
];

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_128(ServiceList::Complete, &[NUS_UUID])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(DEVICE_NAME)
    .build();

/// Connection handed from the radio to the GATT server task
pub static GATT_CONNECTION: Signal<CriticalSectionRawMutex, Connection> = Signal::new();

#[nrf_softdevice::gatt_service(uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e")]
pub struct NordicUart {
    /// Peer to device; incoming data is ignored
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-e50e24dcca9e", write, write_without_response)]
    rx: Vec<u8, NOTIFY_CHUNK>,
    /// Device to peer
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-e50e24dcca9e", notify)]
    tx: Vec<u8, NOTIFY_CHUNK>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    nus: NordicUart,
}

/// Radio send errors
#[derive(Debug, Clone, Copy, Format)]
pub enum RadioError {
    /// No connection
    Disconnected,
    /// SoftDevice rejected the notification
    NotifyFailed,
}

impl From<NotifyValueError> for RadioError {
    fn from(e: NotifyValueError) -> Self {
        match e {
            NotifyValueError::Disconnected => Self::Disconnected,
            NotifyValueError::Raw(_) => Self::NotifyFailed,
        }
    }
}

/// SoftDevice configuration: one peripheral link, nothing else
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            // SAFETY: all-zero is "no access" for the security mode struct
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Run the SoftDevice event loop
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Serve GATT requests for each connection the radio hands over
#[embassy_executor::task]
pub async fn gatt_task(server: &'static Server) -> ! {
    loop {
        let conn = GATT_CONNECTION.wait().await;
        let reason = gatt_server::run(&conn, server, |event| match event {
            ServerEvent::Nus(NordicUartEvent::TxCccdWrite { notifications }) => {
                debug!("NUS notifications enabled: {}", notifications);
            }
            ServerEvent::Nus(NordicUartEvent::RxWrite(_)) => {}
        })
        .await;
        info!("GATT session ended: {:?}", reason);
    }
}

/// Nordic UART streaming radio
pub struct NusRadio {
    sd: &'static Softdevice,
    server: &'static Server,
    conn: Option<Connection>,
}

impl NusRadio {
    pub fn new(sd: &'static Softdevice, server: &'static Server) -> Self {
        Self {
            sd,
            server,
            conn: None,
        }
    }
}

impl StreamingRadio for NusRadio {
    type Error = RadioError;

    /// Marks the start of a connect cycle and drops any stale link
    ///
    /// The SoftDevice only advertises while `wait_for_connection` awaits
    /// the connectable advertisement, so nothing goes on air here.
    async fn start_advertising(&mut self) {
        self.conn = None;
        debug!("NUS advertising armed");
    }

    async fn wait_for_connection(&mut self) {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        // No timeout: advertise until a peer connects
        let config = peripheral::Config::default();
        loop {
            match peripheral::advertise_connectable(self.sd, adv, &config).await {
                Ok(conn) => {
                    GATT_CONNECTION.signal(conn.clone());
                    self.conn = Some(conn);
                    return;
                }
                Err(e) => warn!("Advertising failed, retrying: {:?}", e),
            }
        }
    }

    /// Marks the end of advertising
    ///
    /// The SoftDevice already stopped the connectable advertisement when
    /// the peer connected; this only logs the transition.
    async fn stop_advertising(&mut self) {
        debug!("NUS advertising stopped");
    }

    fn is_connected(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.handle().is_some())
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), RadioError> {
        let conn = self.conn.as_ref().ok_or(RadioError::Disconnected)?;
        for chunk in message.chunks(NOTIFY_CHUNK) {
            let value = Vec::from_slice(chunk).map_err(|_| RadioError::NotifyFailed)?;
            self.server.nus.tx_notify(conn, &value)?;
        }
        Ok(())
    }
}
