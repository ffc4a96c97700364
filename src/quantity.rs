// src/quantity.rs
//
// Quantities: named, shaped outputs of the field/torque pipeline.
//
// A quantity exposes one of two capabilities:
//   - Setter::set(ctx, dst, cansave)     overwrites dst with the quantity's value
//   - Adder::add_to(ctx, dst, cansave)   adds the quantity's contribution into dst
// The caller always owns dst.
//
// `cansave` never changes the numeric result. When it is true and the table
// armed this quantity for the current tick, the quantity also publishes its own
// value to the SaveCache so the table can read it after the pipeline finishes,
// without a second evaluation.
//
// Adders compute their kernel into a private buffer only when publishing; the
// kernels add each cell's contribution with a single `+=`, so both paths give
// bit-identical results.

use crate::effective_field::{Demag, Excitation};
use crate::error::Result;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::regions::Regions;
use crate::vector_field::VectorField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantityId {
    /// Reduced magnetisation (unit length).
    M,
    Regions,
    /// FFT magnitude of m.
    MFft,
    ExchangeMask,
    BDemag,
    BExch,
    BDmi,
    BUni,
    BExt,
    BEff,
    LLTorque,
    STTorque,
    Torque,
}

/// Identity metadata of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityInfo {
    pub name: &'static str,
    pub ncomp: usize,
    pub unit: &'static str,
}

pub const N_QUANTITIES: usize = 13;

impl QuantityId {
    pub const ALL: [QuantityId; N_QUANTITIES] = [
        QuantityId::M,
        QuantityId::Regions,
        QuantityId::MFft,
        QuantityId::ExchangeMask,
        QuantityId::BDemag,
        QuantityId::BExch,
        QuantityId::BDmi,
        QuantityId::BUni,
        QuantityId::BExt,
        QuantityId::BEff,
        QuantityId::LLTorque,
        QuantityId::STTorque,
        QuantityId::Torque,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn info(self) -> QuantityInfo {
        let (name, ncomp, unit) = match self {
            QuantityId::M => ("m", 3, ""),
            QuantityId::Regions => ("regions", 1, ""),
            QuantityId::MFft => ("mFFT", 3, ""),
            QuantityId::ExchangeMask => ("exchangemask", 3, ""),
            QuantityId::BDemag => ("B_demag", 3, "T"),
            QuantityId::BExch => ("B_exch", 3, "T"),
            QuantityId::BDmi => ("B_dmi", 3, "T"),
            QuantityId::BUni => ("B_uni", 3, "T"),
            QuantityId::BExt => ("B_ext", 3, "T"),
            QuantityId::BEff => ("B_eff", 3, "T"),
            QuantityId::LLTorque => ("lltorque", 3, "T"),
            QuantityId::STTorque => ("sttorque", 3, "T"),
            QuantityId::Torque => ("torque", 3, "T"),
        };
        QuantityInfo { name, ncomp, unit }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn ncomp(self) -> usize {
        self.info().ncomp
    }

    pub fn unit(self) -> &'static str {
        self.info().unit
    }
}

/// Everything a pipeline quantity reads during one evaluation.
///
/// The magnetisation, regions and parameters are shared-read for the whole
/// evaluation; they can only change between evaluations.
pub struct FieldContext<'a> {
    pub mesh: &'a Mesh,
    pub m: &'a VectorField,
    pub regions: &'a Regions,
    pub material: &'a Material,
    pub excitation: &'a Excitation,
    pub exchange_mask: &'a VectorField,
    pub demag: &'a mut Demag,
    pub cache: &'a mut SaveCache,
    /// Simulation time of this evaluation (s).
    pub time: f64,
    /// Gyromagnetic ratio (rad/(s·T)).
    pub gamma: f64,
}

pub trait Setter: Sync {
    fn id(&self) -> QuantityId;

    /// Overwrite `dst` with this quantity's current value.
    fn set(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()>;
}

pub trait Adder: Sync {
    fn id(&self) -> QuantityId;

    /// Add this quantity's current contribution into `dst`.
    fn add_to(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool)
        -> Result<()>;
}

/// How a quantity produces its data.
#[derive(Clone, Copy)]
pub enum Capability {
    Set(&'static dyn Setter),
    Add(&'static dyn Adder),
    /// Stored or derived directly from engine state (m, regions, masks).
    Data,
}

/// Run an adder kernel, publishing its contribution when armed.
pub(crate) fn accumulate<F>(
    ctx: &mut FieldContext<'_>,
    id: QuantityId,
    dst: &mut VectorField,
    cansave: bool,
    kernel: F,
) -> Result<()>
where
    F: FnOnce(&mut FieldContext<'_>, &mut VectorField) -> Result<()>,
{
    if cansave && ctx.cache.wants(id) {
        let mut own = ctx.cache.take_buffer(id, *ctx.mesh);
        kernel(ctx, &mut own)?;
        dst.add_assign(&own);
        ctx.cache.store(id, own);
        Ok(())
    } else {
        kernel(ctx, dst)
    }
}

/// Publish a setter's freshly computed value when armed.
pub(crate) fn publish_set(ctx: &mut FieldContext<'_>, id: QuantityId, dst: &VectorField, cansave: bool) {
    if cansave && ctx.cache.wants(id) {
        ctx.cache.publish(id, dst);
    }
}

struct Saved {
    tick: u64,
    field: VectorField,
}

/// Latest published value of every armed quantity.
///
/// A value is only visible for the tick it was published in; the next tick
/// overwrites it.
pub struct SaveCache {
    tick: u64,
    wanted: [bool; N_QUANTITIES],
    slots: Vec<Option<Saved>>,
}

impl Default for SaveCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveCache {
    pub fn new() -> Self {
        Self {
            tick: 0,
            wanted: [false; N_QUANTITIES],
            slots: (0..N_QUANTITIES).map(|_| None).collect(),
        }
    }

    /// Start a new tick: nothing is wanted and nothing published yet.
    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
        self.wanted = [false; N_QUANTITIES];
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn want(&mut self, id: QuantityId) {
        self.wanted[id.index()] = true;
    }

    pub fn wants(&self, id: QuantityId) -> bool {
        self.wanted[id.index()]
    }

    /// Zeroed buffer for `id`, reusing the previous tick's allocation.
    pub fn take_buffer(&mut self, id: QuantityId, mesh: Mesh) -> VectorField {
        match self.slots[id.index()].take() {
            Some(Saved { mut field, .. }) if field.mesh == mesh => {
                field.zero();
                field
            }
            _ => VectorField::new(mesh),
        }
    }

    /// Store `field` as the value of `id` for the current tick.
    pub fn store(&mut self, id: QuantityId, field: VectorField) {
        self.slots[id.index()] = Some(Saved {
            tick: self.tick,
            field,
        });
    }

    /// Copy `src` in as the value of `id` for the current tick.
    pub fn publish(&mut self, id: QuantityId, src: &VectorField) {
        match self.slots[id.index()].as_mut() {
            Some(saved) if saved.field.mesh == src.mesh => {
                saved.field.copy_from(src);
                saved.tick = self.tick;
            }
            _ => self.store(id, src.clone()),
        }
    }

    /// Value of `id` published during the current tick, if any.
    pub fn latest(&self, id: QuantityId) -> Option<&VectorField> {
        self.slots[id.index()]
            .as_ref()
            .filter(|s| s.tick == self.tick)
            .map(|s| &s.field)
    }
}
