// src/engine.rs
//
// Engine: the explicit simulation context. Owns the mesh, magnetisation,
// regions, material, excitation, demag kernel, save cache, table and stepper.
//
// Every torque evaluation is one tick:
//   tick += 1 -> table.arm -> publish m / static data if wanted
//   -> Torque.set -> table.sample

use crate::config::{RunConfig, SolverConfig};
use crate::effective_field::{capability, Demag, Excitation, Torque};
use crate::error::{EngineError, Result};
use crate::fft::fft_magnitude;
use crate::llg::{Dynamics, StepOutcome, Stepper, StepperState};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::quantity::{Adder, Capability, FieldContext, QuantityId, SaveCache, Setter};
use crate::regions::Regions;
use crate::registry::Registry;
use crate::table::Table;
use crate::vector_field::{FieldData, VectorField};

/// Callback run after every accepted step with the new magnetisation and time.
pub type PostStep = Box<dyn FnMut(&mut VectorField, f64) + Send>;

/// Collects the mesh definition before an [`Engine`] exists.
///
/// The mesh can be given in one call (`set_mesh`) or as grid and cell sizes in
/// either order; it is fixed as soon as both are known and cannot change after.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    grid: Option<[usize; 3]>,
    cell: Option<[f64; 3]>,
    mesh: Option<Mesh>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mesh(&mut self, nx: usize, ny: usize, nz: usize, cx: f64, cy: f64, cz: f64) -> Result<()> {
        if self.mesh.is_some() {
            return Err(EngineError::MeshAlreadySet);
        }
        let mesh = Mesh::new(nx, ny, nz, cx, cy, cz)?;
        log::info!("mesh set: {}", mesh.user_string());
        self.grid = Some([nx, ny, nz]);
        self.cell = Some([cx, cy, cz]);
        self.mesh = Some(mesh);
        Ok(())
    }

    pub fn set_grid_size(&mut self, nx: usize, ny: usize, nz: usize) -> Result<()> {
        if self.mesh.is_some() {
            return Err(EngineError::MeshAlreadySet);
        }
        let prev = self.grid.replace([nx, ny, nz]);
        if let Err(e) = self.complete() {
            self.grid = prev;
            return Err(e);
        }
        Ok(())
    }

    pub fn set_cell_size(&mut self, cx: f64, cy: f64, cz: f64) -> Result<()> {
        if self.mesh.is_some() {
            return Err(EngineError::MeshAlreadySet);
        }
        let prev = self.cell.replace([cx, cy, cz]);
        if let Err(e) = self.complete() {
            self.cell = prev;
            return Err(e);
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        if let (Some([nx, ny, nz]), Some([cx, cy, cz])) = (self.grid, self.cell) {
            let mesh = Mesh::new(nx, ny, nz, cx, cy, cz)?;
            log::info!("mesh set: {}", mesh.user_string());
            self.mesh = Some(mesh);
        }
        Ok(())
    }

    pub fn mesh(&self) -> Result<Mesh> {
        self.mesh.ok_or(EngineError::MeshNotSet)
    }

    pub fn grid_size(&self) -> Result<[usize; 3]> {
        Ok(self.mesh()?.grid_size())
    }

    pub fn cell_size(&self) -> Result<[f64; 3]> {
        Ok(self.mesh()?.cell_size())
    }

    pub fn world_size(&self) -> Result<[f64; 3]> {
        Ok(self.mesh()?.world_size())
    }

    pub fn build(self) -> Result<Engine> {
        Ok(Engine::new(self.mesh()?))
    }
}

/// State the torque function reads, plus the table it feeds.
struct Simulation {
    mesh: Mesh,
    m: VectorField,
    regions: Regions,
    material: Material,
    excitation: Excitation,
    exchange_mask: VectorField,
    demag: Demag,
    cache: SaveCache,
    table: Table,
    tick: u64,
    gamma: f64,
    post_step: Vec<PostStep>,
}

impl Simulation {
    fn new(mesh: Mesh, gamma: f64) -> Self {
        let mut exchange_mask = VectorField::new(mesh);
        exchange_mask.set_uniform([1.0; 3]);
        Self {
            mesh,
            m: VectorField::new(mesh),
            regions: Regions::new(mesh),
            material: Material::default(),
            excitation: Excitation::new(),
            exchange_mask,
            demag: Demag::new(true),
            cache: SaveCache::new(),
            table: Table::new(),
            tick: 0,
            gamma,
            post_step: Vec::new(),
        }
    }

    fn context(&mut self, time: f64) -> FieldContext<'_> {
        FieldContext {
            mesh: &self.mesh,
            m: &self.m,
            regions: &self.regions,
            material: &self.material,
            excitation: &self.excitation,
            exchange_mask: &self.exchange_mask,
            demag: &mut self.demag,
            cache: &mut self.cache,
            time,
            gamma: self.gamma,
        }
    }

    /// Publish wanted quantities that are stored rather than computed.
    fn publish_static(&mut self) {
        if self.cache.wants(QuantityId::M) {
            self.cache.publish(QuantityId::M, &self.m);
        }
        if self.cache.wants(QuantityId::ExchangeMask) {
            self.cache
                .publish(QuantityId::ExchangeMask, &self.exchange_mask);
        }
        if self.cache.wants(QuantityId::MFft) {
            self.cache.store(QuantityId::MFft, fft_magnitude(&self.m));
        }
    }

    fn data(&self, id: QuantityId) -> Option<FieldData> {
        match id {
            QuantityId::M => Some(FieldData::Vector(self.m.clone())),
            QuantityId::Regions => Some(FieldData::Scalar(self.regions.to_scalar_field())),
            QuantityId::MFft => Some(FieldData::Vector(fft_magnitude(&self.m))),
            QuantityId::ExchangeMask => Some(FieldData::Vector(self.exchange_mask.clone())),
            _ => None,
        }
    }
}

impl Dynamics for Simulation {
    fn magnetization(&mut self) -> &mut VectorField {
        &mut self.m
    }

    fn torque(&mut self, dst: &mut VectorField, time: f64, cansave: bool) -> Result<()> {
        self.tick += 1;
        self.cache.begin_tick(self.tick);
        self.table.arm(cansave, time, &mut self.cache);
        if cansave {
            self.publish_static();
        }

        let mut ctx = self.context(time);
        Torque.set(&mut ctx, dst, cansave)?;

        self.table.sample(cansave, time, &self.cache)
    }

    fn post_step(&mut self, time: f64) {
        for hook in self.post_step.iter_mut() {
            hook(&mut self.m, time);
        }
    }
}

pub struct Engine {
    sim: Simulation,
    stepper: Stepper,
    registry: Registry,
}

impl Engine {
    /// Engine on `mesh` with default material, demag enabled and default solver settings.
    pub fn new(mesh: Mesh) -> Self {
        let stepper = Stepper::default();
        let gamma = stepper.settings().gamma;
        log::info!("engine created on {}", mesh.user_string());
        Self {
            sim: Simulation::new(mesh, gamma),
            stepper,
            registry: Registry::new(),
        }
    }

    /// Engine with mesh, uniform material, fields and solver settings from `cfg`.
    ///
    /// The magnetisation is left unset.
    pub fn from_config(cfg: &RunConfig) -> Result<Self> {
        let g = &cfg.geometry;
        let mut builder = EngineBuilder::new();
        builder.set_mesh(g.nx, g.ny, g.nz, g.dx, g.dy, g.dz)?;
        let mut engine = builder.build()?;

        let mc = &cfg.material;
        let mat = engine.material_mut();
        mat.set_msat_all(mc.ms);
        mat.aex_mut().set_all(mc.aex);
        mat.alpha_mut().set_all(mc.alpha);
        mat.set_ku1_all(mc.ku1);
        mat.set_anis_u_all(mc.easy_axis);
        mat.dmi_mut().set_all(mc.dmi);
        mat.xi_mut().set_all(mc.xi);
        mat.spin_pol_mut().set_all(mc.spin_pol);

        engine.set_b_ext(cfg.fields.b_ext);
        engine.set_j(cfg.fields.j);
        engine.set_demag_enabled(cfg.fields.demag);
        engine.configure_solver(cfg.solver)?;
        Ok(engine)
    }

    // ---- mesh ----

    pub fn mesh(&self) -> &Mesh {
        &self.sim.mesh
    }

    pub fn grid_size(&self) -> [usize; 3] {
        self.sim.mesh.grid_size()
    }

    pub fn cell_size(&self) -> [f64; 3] {
        self.sim.mesh.cell_size()
    }

    pub fn world_size(&self) -> [f64; 3] {
        self.sim.mesh.world_size()
    }

    pub fn nx(&self) -> usize {
        self.sim.mesh.nx()
    }

    pub fn ny(&self) -> usize {
        self.sim.mesh.ny()
    }

    pub fn nz(&self) -> usize {
        self.sim.mesh.nz()
    }

    // ---- magnetisation ----

    pub fn m(&self) -> &VectorField {
        &self.sim.m
    }

    /// Same direction in every cell. A zero vector leaves every cell empty.
    pub fn set_m_uniform(&mut self, dir: [f64; 3]) {
        self.sim.m.set_uniform(dir);
        self.sim.m.normalize();
    }

    /// Direction as a function of the cell-centre position [x, y, z] (m),
    /// measured from the centre of the box.
    pub fn set_m_fn<F>(&mut self, f: F)
    where
        F: Fn(f64, f64, f64) -> [f64; 3],
    {
        let mesh = self.sim.mesh;
        for (i, v) in self.sim.m.data.iter_mut().enumerate() {
            let [x, y, z] = mesh.cell_center(i);
            *v = f(x, y, z);
        }
        self.sim.m.normalize();
    }

    pub fn set_m(&mut self, m: &VectorField) -> Result<()> {
        m.check_mesh(&self.sim.mesh, "magnetization")?;
        self.sim.m.copy_from(m);
        self.sim.m.normalize();
        Ok(())
    }

    fn check_m(&self) -> Result<()> {
        if self.sim.m.max_norm() == 0.0 {
            return Err(EngineError::MagnetizationNotSet);
        }
        Ok(())
    }

    // ---- regions, material, excitation ----

    pub fn regions(&self) -> &Regions {
        &self.sim.regions
    }

    pub fn regions_mut(&mut self) -> &mut Regions {
        &mut self.sim.regions
    }

    pub fn material(&self) -> &Material {
        &self.sim.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.sim.material
    }

    pub fn excitation(&self) -> &Excitation {
        &self.sim.excitation
    }

    /// Uniform applied induction (Tesla), [x, y, z].
    pub fn set_b_ext(&mut self, b: [f64; 3]) {
        self.sim.excitation.b_ext = b;
    }

    /// Current density (A/m^2), [x, y, z].
    pub fn set_j(&mut self, j: [f64; 3]) {
        self.sim.excitation.j = j;
    }

    /// Add `mask * multiplier(t)` to the applied field.
    pub fn add_ext_field_mask<F>(&mut self, mask: VectorField, multiplier: F) -> Result<()>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.sim
            .excitation
            .add_ext_field(&self.sim.mesh, mask, Box::new(multiplier))
    }

    /// Per-cell scale [x, y, z] of the exchange link to the +axis neighbour.
    pub fn exchange_mask_mut(&mut self) -> &mut VectorField {
        &mut self.sim.exchange_mask
    }

    pub fn set_demag_enabled(&mut self, enabled: bool) {
        self.sim.demag.set_enabled(enabled);
    }

    pub fn demag_enabled(&self) -> bool {
        self.sim.demag.enabled()
    }

    pub fn demag_kernel_built(&self) -> bool {
        self.sim.demag.kernel_built()
    }

    // ---- table ----

    pub fn table(&self) -> &Table {
        &self.sim.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.sim.table
    }

    /// Write one table row for the current state now.
    pub fn table_save(&mut self) -> Result<()> {
        self.check_m()?;
        self.sim.table.force_next();
        let mut scratch = VectorField::new(self.sim.mesh);
        let t = self.stepper.time();
        self.sim.torque(&mut scratch, t, true)
    }

    // ---- solver ----

    pub fn solver_settings(&self) -> &SolverConfig {
        self.stepper.settings()
    }

    pub fn configure_solver(&mut self, settings: SolverConfig) -> Result<()> {
        self.stepper.configure(settings)?;
        self.sim.gamma = settings.gamma;
        Ok(())
    }

    pub fn time(&self) -> f64 {
        self.stepper.time()
    }

    pub fn dt(&self) -> f64 {
        self.stepper.dt()
    }

    /// Number of torque evaluations so far.
    pub fn tick(&self) -> u64 {
        self.sim.tick
    }

    pub fn accepted_steps(&self) -> u64 {
        self.stepper.accepted_steps()
    }

    pub fn rejected_steps(&self) -> u64 {
        self.stepper.rejected_steps()
    }

    pub fn stepper_state(&self) -> StepperState {
        self.stepper.state()
    }

    pub fn add_post_step<F>(&mut self, f: F)
    where
        F: FnMut(&mut VectorField, f64) + Send + 'static,
    {
        self.sim.post_step.push(Box::new(f));
    }

    /// Take one accepted step (retrying rejected attempts with a smaller dt).
    pub fn step(&mut self) -> Result<StepOutcome> {
        self.check_m()?;
        self.stepper.advance(&mut self.sim)
    }

    pub fn steps(&mut self, n: usize) -> Result<()> {
        self.check_m()?;
        for _ in 0..n {
            self.stepper.advance(&mut self.sim)?;
        }
        Ok(())
    }

    /// Advance the simulation time by `duration` seconds, shortening the last
    /// step so it ends on the target time.
    pub fn run(&mut self, duration: f64) -> Result<()> {
        if !(duration >= 0.0) || !duration.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "run duration must be >= 0, got {duration}"
            )));
        }
        self.check_m()?;
        let end = self.stepper.time() + duration;
        let tol = 1e-12 * duration;
        log::info!("run {duration:.3e} s until t={end:.6e} s");

        loop {
            let t = self.stepper.time();
            let remaining = end - t;
            if remaining <= tol || t + remaining == t {
                break;
            }
            if self.stepper.dt() > remaining {
                self.stepper.set_dt(remaining)?;
            }
            self.stepper.advance(&mut self.sim)?;
        }
        Ok(())
    }

    // ---- quantities ----

    pub fn get_quantity(&self, name: &str) -> Result<QuantityId> {
        self.registry.get(name)
    }

    pub fn quantity_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Current value of `id`, computed on demand.
    pub fn fetch(&mut self, id: QuantityId) -> Result<FieldData> {
        if let Some(d) = self.sim.data(id) {
            return Ok(d);
        }
        let mut dst = VectorField::new(self.sim.mesh);
        self.evaluate(id, &mut dst, false)?;
        Ok(FieldData::Vector(dst))
    }

    /// Evaluate a computed quantity into `dst`: setters overwrite it, adders
    /// accumulate into it.
    pub fn evaluate(&mut self, id: QuantityId, dst: &mut VectorField, cansave: bool) -> Result<()> {
        dst.check_mesh(&self.sim.mesh, id.name())?;
        let t = self.stepper.time();
        match capability(id) {
            Capability::Set(q) => {
                self.check_m()?;
                q.set(&mut self.sim.context(t), dst, cansave)
            }
            Capability::Add(q) => {
                self.check_m()?;
                q.add_to(&mut self.sim.context(t), dst, cansave)
            }
            Capability::Data => Err(EngineError::InvalidConfig(format!(
                "{} is stored data, use fetch",
                id.name()
            ))),
        }
    }
}
