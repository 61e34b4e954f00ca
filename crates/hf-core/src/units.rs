// hf-core/src/units.rs

use uom::si::f64::{
    Capacitance as UomCapacitance, ElectricPotential as UomElectricPotential,
    ElectricalResistance as UomElectricalResistance, Inductance as UomInductance,
};

// Public canonical unit types (SI, f64)
pub type Capacitance = UomCapacitance;
pub type Inductance = UomInductance;
pub type Resistance = UomElectricalResistance;
pub type Voltage = UomElectricPotential;

#[inline]
pub fn volts(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn ohms(v: f64) -> Resistance {
    use uom::si::electrical_resistance::ohm;
    Resistance::new::<ohm>(v)
}

#[inline]
pub fn henries(v: f64) -> Inductance {
    use uom::si::inductance::henry;
    Inductance::new::<henry>(v)
}

#[inline]
pub fn farads(v: f64) -> Capacitance {
    use uom::si::capacitance::farad;
    Capacitance::new::<farad>(v)
}
