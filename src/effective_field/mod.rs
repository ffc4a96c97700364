// src/effective_field/mod.rs
//
// Field and torque pipeline. Every quantity below either overwrites (Setter)
// or accumulates into (Adder) a caller-owned buffer, in this fixed order:
//
//   B_demag.set -> B_exch.add -> B_dmi.add -> B_uni.add -> B_ext.add  => B_eff
//   B_eff.set -> LL transform                                          => lltorque
//   lltorque.set -> sttorque.add                                       => torque
//
// All fields are inductions in Tesla; torques are in Tesla as well
// (dm/dt = gamma * torque).

pub mod anisotropy;
pub mod demag;
pub mod dmi;
pub mod exchange;
pub mod torque;
pub mod zeeman;

pub use demag::Demag;
pub use zeeman::{ExtField, Excitation, Multiplier};

use crate::error::Result;
use crate::quantity::{accumulate, publish_set, Adder, Capability, FieldContext, QuantityId, Setter};
use crate::vector_field::VectorField;

/// dm/d(axis) at cell `i` along internal mesh axis `axis` (0 = z, 1 = y, 2 = x).
///
/// Central differences inside, one-sided at the borders, zero along axes with
/// a single cell.
pub(crate) fn derivative(m: &VectorField, i: usize, axis: usize) -> [f64; 3] {
    let mesh = m.mesh;
    let n = mesh.size()[axis];
    if n == 1 {
        return [0.0; 3];
    }
    let d = mesh.cell()[axis];
    let stride = mesh.stride(axis);
    let c = mesh.coords(i)[axis];

    let (lo, hi, span) = if c == 0 {
        (i, i + stride, d)
    } else if c + 1 == n {
        (i - stride, i, d)
    } else {
        (i - stride, i + stride, 2.0 * d)
    };
    let a = m.data[lo];
    let b = m.data[hi];
    [
        (b[0] - a[0]) / span,
        (b[1] - a[1]) / span,
        (b[2] - a[2]) / span,
    ]
}

/// Demagnetising field. Zero when demag is disabled.
pub struct BDemag;

impl Setter for BDemag {
    fn id(&self) -> QuantityId {
        QuantityId::BDemag
    }

    fn set(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        if ctx.demag.enabled() {
            ctx.material.check_msat(ctx.regions)?;
            ctx.demag
                .set_field(ctx.m, ctx.regions, ctx.material.msat(), dst);
        } else {
            dst.zero();
        }
        publish_set(ctx, self.id(), dst, cansave);
        Ok(())
    }
}

pub struct BExch;

impl Adder for BExch {
    fn id(&self) -> QuantityId {
        QuantityId::BExch
    }

    fn add_to(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        ctx.material.check_msat(ctx.regions)?;
        let skip = ctx.material.aex().is_zero();
        accumulate(ctx, self.id(), dst, cansave, |ctx, out| {
            if !skip {
                exchange::add_exchange_field(
                    ctx.m,
                    ctx.exchange_mask,
                    ctx.regions,
                    ctx.material,
                    out,
                );
            }
            Ok(())
        })
    }
}

pub struct BDmi;

impl Adder for BDmi {
    fn id(&self) -> QuantityId {
        QuantityId::BDmi
    }

    fn add_to(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        let skip = ctx.material.dmi().is_zero();
        if !skip {
            ctx.material.check_msat(ctx.regions)?;
        }
        accumulate(ctx, self.id(), dst, cansave, |ctx, out| {
            if !skip {
                dmi::add_dmi_field(ctx.m, ctx.regions, ctx.material, out);
            }
            Ok(())
        })
    }
}

pub struct BUni;

impl Adder for BUni {
    fn id(&self) -> QuantityId {
        QuantityId::BUni
    }

    fn add_to(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        ctx.material.check_msat(ctx.regions)?;
        let skip = ctx.material.ku1().is_zero();
        accumulate(ctx, self.id(), dst, cansave, |ctx, out| {
            if !skip {
                anisotropy::add_uniaxial_anisotropy_field(ctx.m, ctx.regions, ctx.material, out);
            }
            Ok(())
        })
    }
}

/// Applied field. Not registered for lookup by name.
pub struct BExt;

impl Adder for BExt {
    fn id(&self) -> QuantityId {
        QuantityId::BExt
    }

    fn add_to(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        let skip = ctx.excitation.field_is_zero();
        accumulate(ctx, self.id(), dst, cansave, |ctx, out| {
            if !skip {
                zeeman::add_zeeman_field(ctx.excitation, ctx.time, out);
            }
            Ok(())
        })
    }
}

/// Total effective field.
pub struct BEff;

impl Setter for BEff {
    fn id(&self) -> QuantityId {
        QuantityId::BEff
    }

    fn set(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        BDemag.set(ctx, dst, cansave)?;
        BExch.add_to(ctx, dst, cansave)?;
        BDmi.add_to(ctx, dst, cansave)?;
        BUni.add_to(ctx, dst, cansave)?;
        BExt.add_to(ctx, dst, cansave)?;
        publish_set(ctx, self.id(), dst, cansave);
        Ok(())
    }
}

/// Landau-Lifshitz torque of the effective field.
pub struct LLTorque;

impl Setter for LLTorque {
    fn id(&self) -> QuantityId {
        QuantityId::LLTorque
    }

    fn set(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        BEff.set(ctx, dst, cansave)?;
        torque::ll_torque(ctx.m, ctx.regions, ctx.material, dst);
        publish_set(ctx, self.id(), dst, cansave);
        Ok(())
    }
}

/// Zhang-Li spin-transfer torque. Zero without current.
pub struct STTorque;

impl Adder for STTorque {
    fn id(&self) -> QuantityId {
        QuantityId::STTorque
    }

    fn add_to(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        let skip = ctx.excitation.current_is_zero();
        if !skip {
            ctx.material.check_msat(ctx.regions)?;
        }
        accumulate(ctx, self.id(), dst, cansave, |ctx, out| {
            if !skip {
                torque::add_zhang_li_torque(
                    ctx.m,
                    ctx.regions,
                    ctx.material,
                    ctx.excitation.j,
                    ctx.gamma,
                    out,
                );
            }
            Ok(())
        })
    }
}

/// Total torque driving the integrator.
pub struct Torque;

impl Setter for Torque {
    fn id(&self) -> QuantityId {
        QuantityId::Torque
    }

    fn set(&self, ctx: &mut FieldContext<'_>, dst: &mut VectorField, cansave: bool) -> Result<()> {
        LLTorque.set(ctx, dst, cansave)?;
        STTorque.add_to(ctx, dst, cansave)?;
        publish_set(ctx, self.id(), dst, cansave);
        Ok(())
    }
}

/// How the pipeline produces `id`.
pub fn capability(id: QuantityId) -> Capability {
    match id {
        QuantityId::M | QuantityId::Regions | QuantityId::MFft | QuantityId::ExchangeMask => {
            Capability::Data
        }
        QuantityId::BDemag => Capability::Set(&BDemag),
        QuantityId::BExch => Capability::Add(&BExch),
        QuantityId::BDmi => Capability::Add(&BDmi),
        QuantityId::BUni => Capability::Add(&BUni),
        QuantityId::BExt => Capability::Add(&BExt),
        QuantityId::BEff => Capability::Set(&BEff),
        QuantityId::LLTorque => Capability::Set(&LLTorque),
        QuantityId::STTorque => Capability::Add(&STTorque),
        QuantityId::Torque => Capability::Set(&Torque),
    }
}
