//! Shader permutation state
//!
//! Each block owns a table of option names; a [`ShaderVersion`] stores one
//! bitmask per block index, bit `n` enabling option `n` of that block's table.

use crate::render_block::block::BlockIndex;

/// Permutation options selected for one draw
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderVersion {
    options: Vec<u32>,
}

impl ShaderVersion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_option(&mut self, block: BlockIndex, option: u32) {
        let index = block.index();
        if self.options.len() <= index {
            self.options.resize(index + 1, 0);
        }
        self.options[index] |= 1 << option;
    }

    pub fn clear_option(&mut self, block: BlockIndex, option: u32) {
        if let Some(bits) = self.options.get_mut(block.index()) {
            *bits &= !(1 << option);
        }
    }

    pub fn has_option(&self, block: BlockIndex, option: u32) -> bool {
        self.block_options(block) & (1 << option) != 0
    }

    /// Option bits of one block
    pub fn block_options(&self, block: BlockIndex) -> u32 {
        self.options.get(block.index()).copied().unwrap_or(0)
    }

    /// Reset every option to disabled
    pub fn clear(&mut self) {
        self.options.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.options.iter().all(|&bits| bits == 0)
    }

    /// Resolve enabled options to define names using each block's option table
    pub fn defines<'t>(&self, tables: impl IntoIterator<Item = (BlockIndex, &'t [&'static str])>) -> Vec<&'static str> {
        let mut defines = Vec::new();
        for (block, names) in tables {
            let bits = self.block_options(block);
            for (option, name) in names.iter().enumerate() {
                if bits & (1 << option) != 0 {
                    defines.push(*name);
                }
            }
        }
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_are_per_block() {
        let mut version = ShaderVersion::new();
        version.set_option(BlockIndex(2), 1);

        assert!(version.has_option(BlockIndex(2), 1));
        assert!(!version.has_option(BlockIndex(2), 0));
        assert!(!version.has_option(BlockIndex(0), 1));
        assert_eq!(version.block_options(BlockIndex(7)), 0);
    }

    #[test]
    fn test_clear_option() {
        let mut version = ShaderVersion::new();
        version.set_option(BlockIndex(0), 0);
        version.set_option(BlockIndex(0), 1);
        version.clear_option(BlockIndex(0), 0);

        assert_eq!(version.block_options(BlockIndex(0)), 0b10);
        version.clear();
        assert!(version.is_empty());
    }

    #[test]
    fn test_defines_follow_tables() {
        const NAMES: &[&str] = &["RADIANCE_ENVMAP", "RADIANCE_ARRAY"];
        let mut version = ShaderVersion::new();
        version.set_option(BlockIndex(1), 0);

        let defines = version.defines([(BlockIndex(0), NAMES), (BlockIndex(1), NAMES)]);
        assert_eq!(defines, vec!["RADIANCE_ENVMAP"]);
    }
}
