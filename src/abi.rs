//! Contract interfaces consumed by the engine. Calls are ABI-encoded here and
//! routed through a [`crate::chain::ChainClient`], so no RPC bindings are generated.

use alloy::sol;

// ── Executor ───────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract IActionExecutor {
        function executeActions(uint256 tokenId, uint8[] calldata actionIds, bytes[] calldata actionData) external payable;
    }
}

// ── Tokens ─────────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// ── Gravita ────────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract IGravitaAdmin {
        function getValidCollateral() external view returns (address[] memory);
        function priceFeed() external view returns (address);
        function getMintCap(address collateral) external view returns (uint256);
        function getMinNetDebt(address collateral) external view returns (uint256);
        function getTotalAssetDebt(address collateral) external view returns (uint256);
        function getIsActive(address collateral) external view returns (bool);
        function getMcr(address collateral) external view returns (uint256);
        function getCcr(address collateral) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    contract IGravitaPriceFeed {
        function oracles(address token) external view returns (
            address oracleAddress,
            uint8 providerType,
            uint256 timeoutSeconds,
            uint256 decimals,
            bool isEthIndexed
        );
    }
}

sol! {
    #[allow(missing_docs)]
    contract IVesselManager {
        function getVesselColl(address asset, address borrower) external view returns (uint256);
        function getVesselDebt(address asset, address borrower) external view returns (uint256);
        function getVesselStatus(address asset, address borrower) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    contract IVesselManagerOperations {
        function computeNominalCR(uint256 coll, uint256 debt) external pure returns (uint256);
        function getApproxHint(address asset, uint256 cr, uint256 numTrials, uint256 inputRandomSeed)
            external view returns (address hintAddress, uint256 diff, uint256 latestRandomSeed);
    }
}

sol! {
    #[allow(missing_docs)]
    contract ISortedVessels {
        function getSize(address asset) external view returns (uint256);
        function findInsertPosition(address asset, uint256 nicr, address prevId, address nextId)
            external view returns (address, address);
    }
}

// ── Oracles ────────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract IChainlinkAggregator {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }
}

// ── Uniswap V3 ─────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract IQuoter {
        function quoteExactInput(bytes path, uint256 amountIn) external returns (uint256 amountOut);
        function quoteExactOutput(bytes path, uint256 amountOut) external returns (uint256 amountIn);
    }
}

// ── Multicall3 ─────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    contract IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
    }
}
