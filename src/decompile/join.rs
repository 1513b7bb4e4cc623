// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use super::targets;
use crate::ir::BasicBlock;

/// Tidy the block list: drop an empty block nothing jumps at, or
/// join two neighbours with no control-flow boundary between them.
/// At most one edit per call, so the driver can re-enter reduction.
pub(crate) fn coalesce(blocks: &mut Vec<BasicBlock>) -> bool {
    // Remove empty unused blocks.
    for i in 0..blocks.len() {
        if !blocks[i].insts.is_empty() {
            continue;
        }
        let ts = targets(blocks);
        if ts.contains(&blocks[i].loc) {
            continue;
        }
        blocks.remove(i);
        return true;
    }
    // Join neighbouring blocks where possible.
    for i in 0..blocks.len() {
        if i + 2 > blocks.len() {
            break;
        }
        if blocks[i].jump().is_some() {
            continue;
        }
        // An unreduced jump still terminates its block.
        if let Some(inst) = blocks[i].insts.last().and_then(|it| it.as_inst()) {
            if inst.target_loc.is_some() {
                continue;
            }
        }
        let ts = targets(blocks);
        if ts.contains(&blocks[i + 1].loc) {
            continue;
        }
        if blocks[i + 1].is_catch_begin() || blocks[i + 1].is_catch_end() {
            continue;
        }
        let joined = blocks[i].append(blocks[i + 1].insts.clone());
        blocks[i] = joined;
        blocks.remove(i + 1);
        return true;
    }
    false
}
