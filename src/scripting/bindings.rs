//! Device bindings for Rhai scripts.
//!
//! ```rhai
//! print(`${ecc.device_count()} device(s)`);
//! for d in ecc.devices() { print(d); }
//!
//! let dev = ecc.connect(0);
//! dev.set_amplitude(0, 30000);     // mV
//! dev.set_frequency(0, 1000000);   // mHz
//! dev.step_forward(0);
//! dev.step(0, true);               // backward
//! let status = dev.close();        // 0 on success, never throws
//! ```
//!
//! Binding errors become Rhai runtime errors whose message is the
//! `Error calling ...` text of the underlying [`EccError`].

use std::sync::Arc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map};

use crate::binding::{ConnectionHandle, DeviceBinding, DeviceInfo};
use crate::error::EccError;

/// Name of the global holding the [`Ecc`] handle.
pub const GLOBAL_NAME: &str = "ecc";

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Script-side handle to the binding, bound to the `ecc` global.
#[derive(Clone)]
pub struct Ecc {
    binding: Arc<DeviceBinding>,
}

impl Ecc {
    /// Wrap a shared binding.
    pub fn new(binding: Arc<DeviceBinding>) -> Self {
        Self { binding }
    }
}

/// A connected device, returned by `ecc.connect(index)`.
#[derive(Clone)]
pub struct EccDevice {
    binding: Arc<DeviceBinding>,
    handle: ConnectionHandle,
}

impl EccDevice {
    /// Connection handle this device wraps.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }
}

fn to_script_error(err: EccError) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// Rhai integers are 64-bit; the driver takes 32-bit values.
fn to_i32(what: &str, value: i64) -> RhaiResult<i32> {
    i32::try_from(value).map_err(|_| format!("{} {} does not fit in 32 bits", what, value).into())
}

fn info_to_map(info: DeviceInfo) -> Dynamic {
    let mut map = Map::new();
    map.insert("index".into(), Dynamic::from(i64::from(info.index)));
    map.insert("id".into(), Dynamic::from(i64::from(info.id)));
    map.insert("locked".into(), Dynamic::from(info.locked));
    Dynamic::from_map(map)
}

/// Register the `Ecc` and `EccDevice` types and their methods.
pub fn register_device_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<Ecc>("Ecc")
        .register_fn("device_count", |ecc: &mut Ecc| -> RhaiResult<i64> {
            ecc.binding
                .enumerate_devices()
                .map(i64::from)
                .map_err(to_script_error)
        })
        .register_fn("devices", |ecc: &mut Ecc| -> RhaiResult<Array> {
            let devices = ecc.binding.list_devices().map_err(to_script_error)?;
            Ok(devices.into_iter().map(info_to_map).collect())
        })
        .register_fn("connect", |ecc: &mut Ecc, index: i64| -> RhaiResult<EccDevice> {
            let index = to_i32("device index", index)?;
            let handle = ecc.binding.connect(index).map_err(to_script_error)?;
            Ok(EccDevice {
                binding: ecc.binding.clone(),
                handle,
            })
        });

    engine
        .register_type_with_name::<EccDevice>("EccDevice")
        .register_get("handle", |dev: &mut EccDevice| i64::from(dev.handle().raw()))
        .register_fn(
            "set_amplitude",
            |dev: &mut EccDevice, axis: i64, value: i64| -> RhaiResult<()> {
                dev.binding
                    .set_amplitude(dev.handle, to_i32("axis", axis)?, to_i32("amplitude", value)?)
                    .map_err(to_script_error)
            },
        )
        .register_fn(
            "set_frequency",
            |dev: &mut EccDevice, axis: i64, value: i64| -> RhaiResult<()> {
                dev.binding
                    .set_frequency(dev.handle, to_i32("axis", axis)?, to_i32("frequency", value)?)
                    .map_err(to_script_error)
            },
        )
        .register_fn("amplitude", |dev: &mut EccDevice, axis: i64| -> RhaiResult<i64> {
            dev.binding
                .amplitude(dev.handle, to_i32("axis", axis)?)
                .map(i64::from)
                .map_err(to_script_error)
        })
        .register_fn("frequency", |dev: &mut EccDevice, axis: i64| -> RhaiResult<i64> {
            dev.binding
                .frequency(dev.handle, to_i32("axis", axis)?)
                .map(i64::from)
                .map_err(to_script_error)
        })
        .register_fn(
            "step",
            |dev: &mut EccDevice, axis: i64, backward: bool| -> RhaiResult<()> {
                dev.binding
                    .step(dev.handle, to_i32("axis", axis)?, backward)
                    .map_err(to_script_error)
            },
        )
        .register_fn("step_forward", |dev: &mut EccDevice, axis: i64| -> RhaiResult<()> {
            dev.binding
                .step_forward(dev.handle, to_i32("axis", axis)?)
                .map_err(to_script_error)
        })
        .register_fn("step_backward", |dev: &mut EccDevice, axis: i64| -> RhaiResult<()> {
            dev.binding
                .step_backward(dev.handle, to_i32("axis", axis)?)
                .map_err(to_script_error)
        })
        .register_fn("close", |dev: &mut EccDevice| -> i64 {
            i64::from(dev.binding.disconnect(dev.handle).code())
        })
        .register_fn("to_string", |dev: &mut EccDevice| -> String {
            format!("EccDevice(handle={})", dev.handle())
        });
}
