/// How long a device holds its interrupt line by default, in T-states (the ULA's INT pulse)
pub const DEFAULT_INTERRUPT_DURATION: u32 = 32;

/// The byte on the data bus during an interrupt acknowledge when nothing drives it
pub const FLOATING_BUS: u8 = 0xFF;

/// An interrupt asserted by a device
///
/// The request stays visible to the CPU for `duration` T-states after the tick that raised
/// it. `vector` is the byte the device places on the data bus, used by interrupt mode 2.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterruptRequest {
    pub duration: u32,
    pub vector: u8,
}

impl Default for InterruptRequest {
    fn default() -> Self {
        Self {
            duration: DEFAULT_INTERRUPT_DURATION,
            vector: FLOATING_BUS,
        }
    }
}

/// The I/O address space as seen by the CPU
///
/// `port` is the low byte of the address bus and `upper` the high byte (B for the `(C)`
/// forms, A for the `(n)` forms).
pub trait PortMap {
    fn read(&mut self, port: u8, upper: u8) -> u8;
    fn write(&mut self, port: u8, upper: u8, value: u8);

    /// Called once per CPU step with the current clock, returning an edge if any device has
    /// just asserted its interrupt line
    fn tick(&mut self, _now: u64) -> Option<InterruptRequest> {
        None
    }
}

impl<P: PortMap + ?Sized> PortMap for &mut P {
    fn read(&mut self, port: u8, upper: u8) -> u8 {
        (**self).read(port, upper)
    }

    fn write(&mut self, port: u8, upper: u8, value: u8) {
        (**self).write(port, upper, value)
    }

    fn tick(&mut self, now: u64) -> Option<InterruptRequest> {
        (**self).tick(now)
    }
}

/// A device occupying one slot of an `IoPorts` map
pub trait PortDevice {
    fn port_in(&mut self, _upper: u8) -> u8 {
        FLOATING_BUS
    }

    fn port_out(&mut self, _upper: u8, _value: u8) {}

    fn tick(&mut self, _now: u64) -> Option<InterruptRequest> {
        None
    }
}

/// 256 device slots addressed by the low byte of the port address
///
/// Reads from an empty slot return the floating bus value, writes to one are dropped.
pub struct IoPorts {
    devices: Vec<Option<Box<dyn PortDevice>>>,
}

impl Default for IoPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl IoPorts {
    pub fn new() -> Self {
        let mut devices = Vec::with_capacity(256);
        devices.resize_with(256, || None);
        Self {
            devices,
        }
    }

    pub fn connect(&mut self, port: u8, device: Box<dyn PortDevice>) {
        self.devices[port as usize] = Some(device);
    }

    pub fn disconnect(&mut self, port: u8) -> Option<Box<dyn PortDevice>> {
        self.devices[port as usize].take()
    }

    pub fn is_connected(&self, port: u8) -> bool {
        self.devices[port as usize].is_some()
    }
}

impl PortMap for IoPorts {
    fn read(&mut self, port: u8, upper: u8) -> u8 {
        match self.devices[port as usize].as_mut() {
            Some(device) => device.port_in(upper),
            None => FLOATING_BUS,
        }
    }

    fn write(&mut self, port: u8, upper: u8, value: u8) {
        if let Some(device) = self.devices[port as usize].as_mut() {
            device.port_out(upper, value);
        }
    }

    fn tick(&mut self, now: u64) -> Option<InterruptRequest> {
        let mut request = None;
        for device in self.devices.iter_mut().flatten() {
            if let Some(req) = device.tick(now) {
                request.get_or_insert(req);
            }
        }
        request
    }
}
