//! Shader programs and their reflected bindings.
//!
//! After a program links, its active attributes and uniforms are queried from the driver and
//! resolved against the [semantic](super::semantic) tables once. Drawing with the program then
//! only walks the cached bindings.

use arrayvec::{ArrayString, ArrayVec};
use std::fmt::{Display, Formatter};
use tracing::{debug, error, trace, warn};

use crate::log::TARGET_RENDER;
use crate::render::device::{GraphicsDevice, ProgramHandle, ShaderStage, UniformLocation};
use crate::render::semantic::{gl_type_name, AttributeSemantic, UniformKind, UniformSlot};
use crate::render::uniform::{UniformStorage, UniformValue};
use crate::render::vertex_format::VertexFormat;
use crate::render::RenderError;
use crate::resource::path::AssetPath;

/// Most active attributes a program may declare.
pub const MAX_PROGRAM_ATTRIBUTES: usize = 8;
/// Most active uniforms a program may declare.
pub const MAX_PROGRAM_UNIFORMS: usize = 32;
/// Longest attribute or uniform name, in bytes.
pub const MAX_VARIABLE_NAME_LEN: usize = 64;

pub type VariableName = ArrayString<MAX_VARIABLE_NAME_LEN>;

fn variable_name(name: &str) -> Result<VariableName, RenderError> {
    VariableName::from(name).map_err(|_| RenderError::NameTooLong {
        name: name.to_owned(),
        max: MAX_VARIABLE_NAME_LEN,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAttribute {
    pub name: VariableName,
    pub location: u32,
    pub semantic: AttributeSemantic,
    pub gl_type: u32,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramUniform {
    pub name: VariableName,
    pub location: UniformLocation,
    pub slot: UniformSlot,
    pub kind: UniformKind,
    pub size: i32,
}

/// Source of one shader stage.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub stage: ShaderStage,
    /// Where the source came from, for diagnostics.
    pub path: &'a AssetPath,
    pub source: &'a str,
}

/// A linked program with its attribute and uniform bindings.
#[derive(Debug, Clone)]
pub struct Program {
    handle: ProgramHandle,
    attributes: ArrayVec<ProgramAttribute, MAX_PROGRAM_ATTRIBUTES>,
    uniforms: ArrayVec<ProgramUniform, MAX_PROGRAM_UNIFORMS>,
}

impl Program {
    /// Compile and link a program from a vertex and a fragment stage, then reflect it.
    pub fn build(
        device: &mut dyn GraphicsDevice,
        vertex: ShaderSource<'_>,
        fragment: ShaderSource<'_>,
    ) -> Result<Self, RenderError> {
        debug_assert_eq!(vertex.stage, ShaderStage::Vertex);
        debug_assert_eq!(fragment.stage, ShaderStage::Fragment);

        let vertex_shader = compile_shader(device, vertex)?;
        let fragment_shader = match compile_shader(device, fragment) {
            Ok(shader) => shader,
            Err(err) => {
                device.delete_shader(vertex_shader)?;
                return Err(err)
            },
        };

        let handle = device.create_program()?;
        let log = device.link_program(handle, &[vertex_shader, fragment_shader])?;
        device.delete_shader(vertex_shader)?;
        device.delete_shader(fragment_shader)?;
        if !log.info_log.trim().is_empty() {
            warn!(
                target: TARGET_RENDER,
                vertex = %vertex.path,
                fragment = %fragment.path,
                info_log = log.info_log.trim(),
                "Program link log",
            );
        }
        if !log.success {
            error!(target: TARGET_RENDER, vertex = %vertex.path, fragment = %fragment.path, "Program failed to link");
            device.delete_program(handle)?;
            return Err(RenderError::ProgramLink { info_log: log.info_log })
        }

        match Self::reflect(device, handle) {
            Ok(program) => Ok(program),
            Err(err) => {
                device.delete_program(handle)?;
                Err(err)
            },
        }
    }

    /// Resolve the active attributes and uniforms of an already linked program.
    pub fn reflect(device: &mut dyn GraphicsDevice, handle: ProgramHandle) -> Result<Self, RenderError> {
        let mut attributes = ArrayVec::new();
        let active_attributes = device.active_attributes(handle)?;
        debug!(target: TARGET_RENDER, %handle, count = active_attributes.len(), "Active attributes");
        for (idx, var) in active_attributes.into_iter().enumerate() {
            trace!(target: TARGET_RENDER, "[{idx}]: {} '{}' {}", gl_type_name(var.gl_type), var.name, var.size);
            let semantic = AttributeSemantic::from_shader_name(&var.name)
                .ok_or_else(|| RenderError::UnknownAttribute { name: var.name.clone() })?;
            let location = device.attribute_location(handle, &var.name)?
                .ok_or_else(|| RenderError::MissingLocation { name: var.name.clone() })?;
            attributes.try_push(ProgramAttribute {
                name: variable_name(&var.name)?,
                location,
                semantic,
                gl_type: var.gl_type,
                size: var.size,
            }).map_err(|_| RenderError::TooManyAttributes { max: MAX_PROGRAM_ATTRIBUTES })?;
        }

        let mut uniforms = ArrayVec::new();
        let active_uniforms = device.active_uniforms(handle)?;
        debug!(target: TARGET_RENDER, %handle, count = active_uniforms.len(), "Active uniforms");
        for (idx, var) in active_uniforms.into_iter().enumerate() {
            trace!(target: TARGET_RENDER, "[{idx}]: {} '{}' {}", gl_type_name(var.gl_type), var.name, var.size);
            let slot = UniformSlot::from_shader_name(&var.name)
                .ok_or_else(|| RenderError::UnknownUniform { name: var.name.clone() })?;
            let kind = UniformKind::from_gl_type(var.gl_type)
                .filter(|kind| *kind == slot.kind() && var.size == 1)
                .ok_or_else(|| RenderError::UnsupportedUniform {
                    name: var.name.clone(),
                    gl_type: var.gl_type,
                    size: var.size,
                })?;
            let location = device.uniform_location(handle, &var.name)?
                .ok_or_else(|| RenderError::MissingLocation { name: var.name.clone() })?;
            uniforms.try_push(ProgramUniform {
                name: variable_name(&var.name)?,
                location,
                slot,
                kind,
                size: var.size,
            }).map_err(|_| RenderError::TooManyUniforms { max: MAX_PROGRAM_UNIFORMS })?;
        }

        Ok(Self {
            handle,
            attributes,
            uniforms,
        })
    }

    #[inline]
    pub fn handle(&self) -> ProgramHandle { self.handle }

    #[inline]
    pub fn attributes(&self) -> &[ProgramAttribute] { &self.attributes }

    #[inline]
    pub fn uniforms(&self) -> &[ProgramUniform] { &self.uniforms }

    /// Make this program current, point its attributes into the bound array buffer as laid out by
    /// `format`, and apply every uniform it uses from `storage`.
    pub fn enable(
        &self,
        device: &mut dyn GraphicsDevice,
        format: &VertexFormat,
        storage: &UniformStorage,
    ) -> Result<(), RenderError> {
        device.use_program(Some(self.handle))?;
        for attribute in &self.attributes {
            let entry = format.entry(attribute.semantic)
                .ok_or_else(|| RenderError::MissingVertexAttribute {
                    name: attribute.name.to_string(),
                    semantic: attribute.semantic,
                })?;
            device.enable_vertex_attrib_array(attribute.location);
            device.vertex_attrib_pointer_f32(
                attribute.location,
                entry.components,
                entry.stride,
                entry.offset,
            );
        }
        for uniform in &self.uniforms {
            apply_uniform(device, uniform.location, storage.get(uniform.slot))?;
        }
        Ok(())
    }

    /// Disable the attribute arrays [enable()](Self::enable) turned on.
    pub fn disable(&self, device: &mut dyn GraphicsDevice) {
        for attribute in &self.attributes {
            device.disable_vertex_attrib_array(attribute.location);
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} attributes, {} uniforms)",
            self.handle,
            self.attributes.len(),
            self.uniforms.len(),
        )
    }
}

fn compile_shader(
    device: &mut dyn GraphicsDevice,
    source: ShaderSource<'_>,
) -> Result<crate::render::device::ShaderHandle, RenderError> {
    let shader = device.create_shader(source.stage)?;
    let log = device.compile_shader(shader, source.source)?;
    if log.success {
        trace!(target: TARGET_RENDER, stage = %source.stage, path = %source.path, "Compiled shader");
        Ok(shader)
    } else {
        error!(
            target: TARGET_RENDER,
            stage = %source.stage,
            path = %source.path,
            info_log = log.info_log.trim(),
            "Shader failed to compile",
        );
        device.delete_shader(shader)?;
        Err(RenderError::ShaderCompile {
            stage: source.stage,
            path: source.path.clone(),
            info_log: log.info_log,
        })
    }
}

fn apply_uniform(
    device: &mut dyn GraphicsDevice,
    location: UniformLocation,
    value: &UniformValue,
) -> Result<(), RenderError> {
    match value {
        UniformValue::Vec4(v) => device.uniform_vec4(location, [v.x, v.y, v.z, v.w]),
        UniformValue::Mat4(m) => {
            let mut values = [0.0; 16];
            values.copy_from_slice(m.as_slice());
            device.uniform_mat4(location, &values)
        },
        UniformValue::Sampler(unit) => device.uniform_sampler(location, *unit),
    }
}
