pub use crate::{
    fugit::{ExtU32 as _, RateExtU32 as _},
    i2c::I2cPeriph as _,
    os::{NotifierIsr as _, NotifyReceiver as _, TimeoutStatus as _},
    spi::SpiPeriph as _,
    time::U32Ext as _,
    transfer::FifoPeriph as _,
    uart::UartPeriph as _,
};
