//! Configuration build orchestration.
//!
//! ## Architecture
//!
//! The build is a table-driven pipeline over a [`BuildContext`]:
//!
//! ```text
//!   1. Platform          (select firmware or generic platform)
//!   2. BaseConfig        (bootloader + CPUs + memory, attach platform)
//!   3. Devices           (explicit devices, in spec order)
//!   4. ImplicitDevices   (timesync vsock, after explicit devices)
//!   5. Finalize          (flush categories, wrap console ports)
//!   6. Validate          (engine validation; bare `false` is an error)
//! ```
//!
//! Any task error ends the build; the context and its half-built builder
//! are dropped with it.

use super::builder::MachineConfigurationBuilder;
use super::platform::select_platform;
use crate::config::VirtualMachineSpec;
use crate::devices::{DeviceContribution, VirtioVsock};
use crate::engine::{Engine, MachineConfiguration, PlatformConfiguration};
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineExecutor, PipelineMetrics, PipelineTask};
use vfkit_shared::errors::{VfkitError, VfkitResult};

// ============================================================================
// EXECUTION PLAN
// ============================================================================

fn build_plan<'a>() -> ExecutionPlan<BuildContext<'a>> {
    let tasks: Vec<BoxedTask<BuildContext<'a>>> = vec![
        Box::new(PlatformTask),
        Box::new(BaseConfigTask),
        Box::new(DevicesTask),
        Box::new(ImplicitDevicesTask),
        Box::new(FinalizeTask),
        Box::new(ValidateTask),
    ];
    ExecutionPlan::new(tasks)
}

/// Timing of each build task.
#[derive(Debug, Clone)]
pub struct BuildMetrics {
    pipeline: PipelineMetrics,
}

impl BuildMetrics {
    pub fn total_duration_ms(&self) -> u128 {
        self.pipeline.total_duration_ms
    }

    pub fn task_duration_ms(&self, task: &str) -> Option<u128> {
        self.pipeline.task_duration_ms(task)
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.pipeline.task_names().collect()
    }

    pub fn log_build_tasks(&self) {
        for task in &self.pipeline.tasks {
            tracing::debug!(task = %task.name, duration_ms = task.duration_ms, "Build task finished");
        }
        tracing::info!(
            duration_ms = self.pipeline.total_duration_ms,
            "Virtual machine configuration built"
        );
    }
}

/// A validated configuration and how long it took to build.
#[derive(Debug)]
pub struct BuildOutput {
    pub configuration: MachineConfiguration,
    pub metrics: BuildMetrics,
}

/// Translate `spec` into a validated engine configuration.
pub fn build_configuration(
    spec: &VirtualMachineSpec,
    engine: &dyn Engine,
) -> VfkitResult<BuildOutput> {
    spec.sanitize()?;

    let mut ctx = BuildContext::new(spec, engine);
    let pipeline = PipelineExecutor::execute(build_plan(), &mut ctx)?;

    let configuration = ctx
        .configuration
        .take()
        .ok_or_else(|| VfkitError::Internal("finalize task must run first".into()))?;

    let metrics = BuildMetrics { pipeline };
    metrics.log_build_tasks();

    Ok(BuildOutput {
        configuration,
        metrics,
    })
}

/// Devices the build adds on its own, never part of `spec.devices`.
pub fn implicit_devices(spec: &VirtualMachineSpec) -> Vec<VirtioVsock> {
    spec.timesync_port()
        .map(|port| VirtioVsock {
            port,
            socket_path: None,
            listen: false,
        })
        .into_iter()
        .collect()
}

/// Contribute `devices` in order, stopping at the first failure.
fn contribute_devices<'d>(
    builder: &mut MachineConfigurationBuilder,
    devices: impl IntoIterator<Item = &'d dyn DeviceContribution>,
) -> VfkitResult<()> {
    for device in devices {
        builder.contribute(device).inspect_err(|e| {
            tracing::warn!(device = device.kind(), error = %e, "Device contribution failed");
        })?;
    }
    Ok(())
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Shared build state: inputs plus the output of each task.
pub(crate) struct BuildContext<'a> {
    spec: &'a VirtualMachineSpec,
    engine: &'a dyn Engine,
    platform: Option<PlatformConfiguration>,
    builder: Option<MachineConfigurationBuilder>,
    configuration: Option<MachineConfiguration>,
}

impl<'a> BuildContext<'a> {
    fn new(spec: &'a VirtualMachineSpec, engine: &'a dyn Engine) -> Self {
        Self {
            spec,
            engine,
            platform: None,
            builder: None,
            configuration: None,
        }
    }

    fn builder_mut(&mut self) -> VfkitResult<&mut MachineConfigurationBuilder> {
        self.builder
            .as_mut()
            .ok_or_else(|| VfkitError::Internal("base_config task must run first".into()))
    }
}

// ============================================================================
// TASKS
// ============================================================================

struct PlatformTask;

impl<'a> PipelineTask<BuildContext<'a>> for PlatformTask {
    fn run(&self, ctx: &mut BuildContext<'a>) -> VfkitResult<()> {
        let platform = select_platform(ctx.engine, &ctx.spec.bootloader, ctx.spec.nested)?;
        tracing::info!(platform_type = %platform.kind(), "Platform configured");
        ctx.platform = Some(platform);
        Ok(())
    }

    fn name(&self) -> &str {
        "platform"
    }
}

struct BaseConfigTask;

impl<'a> PipelineTask<BuildContext<'a>> for BaseConfigTask {
    fn run(&self, ctx: &mut BuildContext<'a>) -> VfkitResult<()> {
        let bootloader = ctx.spec.bootloader.to_engine()?;
        let config =
            ctx.engine
                .new_base_configuration(&bootloader, ctx.spec.vcpus, ctx.spec.memory_bytes)?;

        let platform = ctx
            .platform
            .take()
            .ok_or_else(|| VfkitError::Internal("platform task must run first".into()))?;

        ctx.builder = Some(MachineConfigurationBuilder::new(config, platform));
        Ok(())
    }

    fn name(&self) -> &str {
        "base_config"
    }
}

struct DevicesTask;

impl<'a> PipelineTask<BuildContext<'a>> for DevicesTask {
    fn run(&self, ctx: &mut BuildContext<'a>) -> VfkitResult<()> {
        let spec = ctx.spec;
        let builder = ctx.builder_mut()?;
        contribute_devices(
            builder,
            spec.devices.iter().map(|dev| dev as &dyn DeviceContribution),
        )
    }

    fn name(&self) -> &str {
        "devices"
    }
}

struct ImplicitDevicesTask;

impl<'a> PipelineTask<BuildContext<'a>> for ImplicitDevicesTask {
    fn run(&self, ctx: &mut BuildContext<'a>) -> VfkitResult<()> {
        let implicit = implicit_devices(ctx.spec);
        for dev in &implicit {
            tracing::debug!(port = dev.port, "Adding timesync vsock device");
        }

        let builder = ctx.builder_mut()?;
        contribute_devices(
            builder,
            implicit.iter().map(|dev| dev as &dyn DeviceContribution),
        )
    }

    fn name(&self) -> &str {
        "implicit_devices"
    }
}

struct FinalizeTask;

impl<'a> PipelineTask<BuildContext<'a>> for FinalizeTask {
    fn run(&self, ctx: &mut BuildContext<'a>) -> VfkitResult<()> {
        let builder = ctx
            .builder
            .take()
            .ok_or_else(|| VfkitError::Internal("base_config task must run first".into()))?;
        ctx.configuration = Some(builder.finish()?);
        Ok(())
    }

    fn name(&self) -> &str {
        "finalize"
    }
}

struct ValidateTask;

impl<'a> PipelineTask<BuildContext<'a>> for ValidateTask {
    fn run(&self, ctx: &mut BuildContext<'a>) -> VfkitResult<()> {
        let config = ctx
            .configuration
            .as_ref()
            .ok_or_else(|| VfkitError::Internal("finalize task must run first".into()))?;

        if !ctx.engine.validate(config)? {
            return Err(VfkitError::InvalidConfiguration);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "validate"
    }
}
